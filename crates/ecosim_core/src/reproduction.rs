use crate::brain;
use crate::config::AppConfig;
use crate::genome;
use crate::lifecycle;
use crate::relationships::RelationshipLogic;
use ecosim_data::{Agent, AgentId, Position};
use rand::Rng;

/// Bond strength added between partners and between parent and child.
pub const PAIR_BOND: f32 = 0.3;

pub struct ReproductionContext<'a, R: Rng> {
    pub tick: u64,
    pub config: &'a AppConfig,
    pub rng: &'a mut R,
    /// Next free agent id; advanced on every birth.
    pub next_id: &'a mut AgentId,
}

/// Pure compatibility test: opposite sex, both alive and fertile, both at or
/// above the energy threshold, both cooldowns elapsed.
pub fn is_compatible(a: &Agent, b: &Agent, config: &AppConfig) -> bool {
    let threshold = config.reproduction.energy_threshold;
    a.id != b.id
        && a.is_alive()
        && b.is_alive()
        && a.sex == b.sex.opposite()
        && a.can_reproduce
        && b.can_reproduce
        && a.energy >= threshold
        && b.energy >= threshold
        && a.reproduction_cooldown == 0
        && b.reproduction_cooldown == 0
}

/// Probability that a compatible pair conceives.
pub fn conception_chance(a: &Agent, b: &Agent) -> f64 {
    let fertility = (f64::from(a.genome.fertility) + f64::from(b.genome.fertility)) * 0.5;
    (0.5 + 0.5 * fertility).clamp(0.0, 1.0)
}

fn spawn_position<R: Rng>(a: &Agent, b: &Agent, spread: f64, rng: &mut R) -> Position {
    let mid = Position::new(
        (a.position.x + b.position.x) * 0.5,
        (a.position.y + b.position.y) * 0.5,
    );
    let spread = if spread.is_finite() { spread.max(0.0) } else { 0.0 };
    if spread == 0.0 || !mid.is_finite() {
        return mid;
    }
    Position::new(
        mid.x + rng.gen_range(-spread..=spread),
        mid.y + rng.gen_range(-spread..=spread),
    )
}

/// Sexual reproduction. On success both parents pay the energy cost, enter
/// cooldown and bond with each other and with the child. On failure neither
/// parent is touched.
pub fn reproduce<R: Rng>(
    a: &mut Agent,
    b: &mut Agent,
    ctx: &mut ReproductionContext<'_, R>,
) -> Option<Agent> {
    let config = ctx.config;
    if !is_compatible(a, b, config) {
        return None;
    }
    if !ctx.rng.gen_bool(conception_chance(a, b)) {
        return None;
    }

    let child_genome = genome::inherit(&a.genome, &b.genome, config, ctx.rng);
    let position = spawn_position(a, b, config.reproduction.spawn_spread, ctx.rng);
    let id = *ctx.next_id;
    *ctx.next_id += 1;

    let mut child = lifecycle::create_agent(
        id,
        position,
        child_genome,
        config.reproduction.offspring_energy,
        ctx.tick,
        config,
        ctx.rng,
    );
    child.policy = brain::inherit_policy(&a.policy, &b.policy, config, ctx.rng);
    child.generation = a.generation.max(b.generation) + 1;
    child.parent_ids = Some((a.id, b.id));

    let (a_id, b_id) = (a.id, b.id);
    for (parent, partner) in [(&mut *a, b_id), (&mut *b, a_id)] {
        parent.energy = (parent.energy - config.reproduction.energy_cost).clamp(0.0, 100.0);
        parent.reproduction_cooldown = config.reproduction.cooldown_ticks;
        parent.offspring_count += 1;
        parent.mate_lock = None;
        parent.relationships.add_ally(partner, PAIR_BOND, ctx.tick);
        parent.relationships.add_ally(id, PAIR_BOND, ctx.tick);
        child.relationships.add_ally(parent.id, PAIR_BOND, ctx.tick);
    }

    tracing::debug!(
        child = id,
        parents = ?(a_id, b_id),
        generation = child.generation,
        "Offspring born"
    );
    Some(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosim_data::{Genome, Sex};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pair(rng: &mut ChaCha8Rng, config: &AppConfig) -> (Agent, Agent) {
        let mut a = lifecycle::create_agent(
            1,
            Position::new(10.0, 10.0),
            Genome {
                fertility: 1.0,
                ..Genome::default()
            },
            90.0,
            0,
            config,
            rng,
        );
        let mut b = lifecycle::create_agent(
            2,
            Position::new(12.0, 10.0),
            Genome {
                fertility: 1.0,
                ..Genome::default()
            },
            90.0,
            0,
            config,
            rng,
        );
        a.sex = Sex::Female;
        b.sex = Sex::Male;
        (a, b)
    }

    #[test]
    fn test_successful_reproduction() {
        let config = AppConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (mut a, mut b) = pair(&mut rng, &config);
        let mut next_id = 100;
        let child = reproduce(
            &mut a,
            &mut b,
            &mut ReproductionContext {
                tick: 5,
                config: &config,
                rng: &mut rng,
                next_id: &mut next_id,
            },
        )
        .expect("fertile pair conceives");

        assert_eq!(child.id, 100);
        assert_eq!(next_id, 101);
        assert_eq!(child.parent_ids, Some((1, 2)));
        assert_eq!(child.generation, 1);
        assert_eq!(child.energy, config.reproduction.offspring_energy);
        assert!(child.genome.is_within_bounds());
        assert_eq!(a.energy, 90.0 - config.reproduction.energy_cost);
        assert_eq!(b.reproduction_cooldown, config.reproduction.cooldown_ticks);
        assert!(a.relationships.allies.contains_key(&2));
        assert!(b.relationships.allies.contains_key(&100));
        assert!(child.relationships.allies.contains_key(&1));
        assert!(child.position.distance(&Position::new(11.0, 10.0)) <= 3.0 * 2f64.sqrt());
    }

    #[test]
    fn test_failure_leaves_parents_untouched() {
        let config = AppConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (mut a, mut b) = pair(&mut rng, &config);
        b.energy = config.reproduction.energy_threshold - 1.0;
        let (a0, b0) = (a.clone(), b.clone());
        let mut next_id = 100;
        let out = reproduce(
            &mut a,
            &mut b,
            &mut ReproductionContext {
                tick: 5,
                config: &config,
                rng: &mut rng,
                next_id: &mut next_id,
            },
        );
        assert!(out.is_none());
        assert_eq!(next_id, 100);
        assert_eq!(a.energy, a0.energy);
        assert_eq!(b.energy, b0.energy);
        assert_eq!(a.relationships, a0.relationships);
        assert_eq!(a.offspring_count, 0);
    }

    #[test]
    fn test_same_sex_and_cooldown_block() {
        let config = AppConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (a, mut b) = pair(&mut rng, &config);
        assert!(is_compatible(&a, &b, &config));
        b.sex = Sex::Female;
        assert!(!is_compatible(&a, &b, &config));
        b.sex = Sex::Male;
        b.reproduction_cooldown = 1;
        assert!(!is_compatible(&a, &b, &config));
        b.reproduction_cooldown = 0;
        b.can_reproduce = false;
        assert!(!is_compatible(&a, &b, &config));
    }
}
