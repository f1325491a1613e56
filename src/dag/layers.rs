//! Layer planning
//!
//! Chooses the intermediate layer count and the cluster-type label of each
//! layer before any cluster is placed. Required counts are seeded first,
//! mini dungeons pad the remainder, major bosses claim a ratio-driven share
//! of the non-final slots, and the rest is shuffled.

use crate::cluster::ClusterType;
use crate::config::{RequirementsConfig, StructureConfig};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Plan the per-layer cluster types for one generation attempt.
pub fn plan_layers(
    requirements: &RequirementsConfig,
    structure: &StructureConfig,
    rng: &mut StdRng,
) -> Vec<ClusterType> {
    let total = rng.gen_range(structure.min_layers..=structure.max_layers);

    let mut labels = Vec::with_capacity(total);
    labels.extend(std::iter::repeat(ClusterType::LegacyDungeon).take(requirements.legacy_dungeons));
    labels.extend(std::iter::repeat(ClusterType::MiniDungeon).take(requirements.mini_dungeons));
    labels.extend(std::iter::repeat(ClusterType::BossArena).take(requirements.bosses));
    while labels.len() < total {
        labels.push(ClusterType::MiniDungeon);
    }
    labels.truncate(total);

    // Major bosses replace up to floor(total * ratio) slots, drawn from
    // every index but the last: the last intermediate layer funnels into
    // the final boss.
    let wanted = (total as f64 * structure.major_boss_ratio).floor() as usize;
    let mut slots: Vec<usize> = (0..total.saturating_sub(1)).collect();
    slots.shuffle(rng);
    let major_slots: HashSet<usize> = slots.into_iter().take(wanted).collect();
    for &i in &major_slots {
        labels[i] = ClusterType::MajorBoss;
    }

    // Shuffle the remaining labels among the non-major positions.
    let rest_positions: Vec<usize> = (0..total).filter(|i| !major_slots.contains(i)).collect();
    let mut rest_labels: Vec<ClusterType> =
        rest_positions.iter().map(|&i| labels[i]).collect();
    rest_labels.shuffle(rng);
    for (&pos, label) in rest_positions.iter().zip(rest_labels) {
        labels[pos] = label;
    }

    // Force the first layer type. Major-boss replacement wins a conflict
    // over slot 0; otherwise the forced label swaps with a matching later
    // slot when one exists, or overwrites slot 0 outright.
    if let Some(first) = structure.first_layer_type {
        let wanted_type = first.cluster_type();
        if !major_slots.contains(&0) && labels[0] != wanted_type {
            let swap = (1..total)
                .find(|i| !major_slots.contains(i) && labels[*i] == wanted_type);
            match swap {
                Some(i) => labels.swap(0, i),
                None => labels[0] = wanted_type,
            }
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FirstLayerType;
    use rand::SeedableRng;

    fn count(labels: &[ClusterType], kind: ClusterType) -> usize {
        labels.iter().filter(|&&l| l == kind).count()
    }

    fn structure(min: usize, max: usize) -> StructureConfig {
        StructureConfig {
            min_layers: min,
            max_layers: max,
            major_boss_ratio: 0.0,
            ..StructureConfig::default()
        }
    }

    #[test]
    fn test_total_within_bounds() {
        let req = RequirementsConfig::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = plan_layers(&req, &structure(4, 7), &mut rng);
            assert!(plan.len() >= 4 && plan.len() <= 7);
        }
    }

    #[test]
    fn test_required_counts_present() {
        let req = RequirementsConfig {
            legacy_dungeons: 2,
            mini_dungeons: 3,
            bosses: 1,
        };
        let mut rng = StdRng::seed_from_u64(9);
        let plan = plan_layers(&req, &structure(6, 6), &mut rng);
        assert_eq!(plan.len(), 6);
        assert_eq!(count(&plan, ClusterType::LegacyDungeon), 2);
        assert_eq!(count(&plan, ClusterType::MiniDungeon), 3);
        assert_eq!(count(&plan, ClusterType::BossArena), 1);
    }

    #[test]
    fn test_padding_is_mini_dungeon() {
        let req = RequirementsConfig {
            legacy_dungeons: 1,
            mini_dungeons: 0,
            bosses: 0,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let plan = plan_layers(&req, &structure(5, 5), &mut rng);
        assert_eq!(count(&plan, ClusterType::LegacyDungeon), 1);
        assert_eq!(count(&plan, ClusterType::MiniDungeon), 4);
    }

    #[test]
    fn test_ratio_one_fills_all_but_last() {
        let req = RequirementsConfig::default();
        let mut st = structure(5, 5);
        st.major_boss_ratio = 1.0;
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = plan_layers(&req, &st, &mut rng);
            assert_eq!(count(&plan[..4], ClusterType::MajorBoss), 4);
            assert_ne!(plan[4], ClusterType::MajorBoss);
        }
    }

    #[test]
    fn test_single_layer_gets_no_major() {
        let req = RequirementsConfig {
            legacy_dungeons: 0,
            mini_dungeons: 1,
            bosses: 0,
        };
        let mut st = structure(1, 1);
        st.major_boss_ratio = 1.0;
        let mut rng = StdRng::seed_from_u64(0);
        let plan = plan_layers(&req, &st, &mut rng);
        assert_eq!(plan, vec![ClusterType::MiniDungeon]);
    }

    #[test]
    fn test_first_layer_forced_by_swap() {
        let req = RequirementsConfig {
            legacy_dungeons: 1,
            mini_dungeons: 3,
            bosses: 0,
        };
        let mut st = structure(4, 4);
        st.first_layer_type = Some(FirstLayerType::LegacyDungeon);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = plan_layers(&req, &st, &mut rng);
            assert_eq!(plan[0], ClusterType::LegacyDungeon);
            // The swap keeps counts intact.
            assert_eq!(count(&plan, ClusterType::LegacyDungeon), 1);
            assert_eq!(count(&plan, ClusterType::MiniDungeon), 3);
        }
    }

    #[test]
    fn test_first_layer_forced_by_overwrite() {
        let req = RequirementsConfig {
            legacy_dungeons: 0,
            mini_dungeons: 2,
            bosses: 0,
        };
        let mut st = structure(2, 2);
        st.first_layer_type = Some(FirstLayerType::BossArena);
        let mut rng = StdRng::seed_from_u64(5);
        let plan = plan_layers(&req, &st, &mut rng);
        // No boss_arena label existed: one padding slot is consumed.
        assert_eq!(plan[0], ClusterType::BossArena);
        assert_eq!(count(&plan, ClusterType::MiniDungeon), 1);
    }

    #[test]
    fn test_major_boss_wins_slot_zero() {
        let req = RequirementsConfig {
            legacy_dungeons: 0,
            mini_dungeons: 2,
            bosses: 0,
        };
        let mut st = structure(2, 2);
        st.major_boss_ratio = 0.5; // one major slot, drawn from [0, 0]
        st.first_layer_type = Some(FirstLayerType::MiniDungeon);
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_layers(&req, &st, &mut rng);
        assert_eq!(plan[0], ClusterType::MajorBoss);
    }

    #[test]
    fn test_deterministic() {
        let req = RequirementsConfig::default();
        let st = StructureConfig::default();
        let a = plan_layers(&req, &st, &mut StdRng::seed_from_u64(77));
        let b = plan_layers(&req, &st, &mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }
}
