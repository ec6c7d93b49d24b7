/// Asserts that the agent with the given id is no longer in the world.
#[macro_export]
macro_rules! assert_agent_dead {
    ($world:expr, $id:expr) => {
        assert!(
            $world.agent($id).is_none(),
            "Agent {} should be dead but was found alive",
            $id
        );
    };
}

/// Asserts that every living agent satisfies the resource invariants.
#[macro_export]
macro_rules! assert_invariants {
    ($world:expr) => {
        for agent in &$world.agents {
            assert!(
                (0.0..=100.0).contains(&agent.health),
                "Agent {} health {} out of range",
                agent.id,
                agent.health
            );
            assert!(
                (0.0..=100.0).contains(&agent.energy),
                "Agent {} energy {} out of range",
                agent.id,
                agent.energy
            );
            assert!(
                agent.age <= agent.lifespan,
                "Agent {} outlived its lifespan",
                agent.id
            );
            assert!(agent.position.is_finite(), "Agent {} position not finite", agent.id);
        }
    };
}
