//! End-to-end scenarios for kingdom_core.
//!
//! Each test drives the public transition API the way a host would and
//! checks concrete numbers against hand-computed values.

use kingdom_core::achievements::{check_achievements, pending_notifications};
use kingdom_core::economy::{building_cost, try_buy_building};
use kingdom_core::loop_actions::try_start_loop_action;
use kingdom_core::persistence::{self, export, import, serialize};
use kingdom_core::prestige::{do_prestige, prestige_gain};
use kingdom_core::simulation::{catch_up, tick, Simulation};
use kingdom_test_utils::fixtures::{builtin_config, fresh, parse_script, rich_state, run_script, seeded_rng, tiny_config};

// =============================================================================
// Prestige
// =============================================================================

mod prestige {
    use super::*;

    #[test]
    fn test_gain_from_four_thousand_lifetime_food() {
        let config = builtin_config();
        let mut state = fresh(&config);
        state.lifetime.insert("food".into(), 4_000.0);
        assert_eq!(prestige_gain(&config, &state), 2.0);
    }

    #[test]
    fn test_fresh_prestige_is_neutral() {
        let config = builtin_config();
        let start = fresh(&config).with_upgrade_level("strong_arms", 2);
        let mut rng = seeded_rng(3);

        assert_eq!(prestige_gain(&config, &start), 0.0);
        let next = do_prestige(&config, &start, &mut rng);

        assert_eq!(next.resource("prestige"), 0.0);
        assert_eq!(next.upgrades, start.upgrades);
        assert_eq!(next.resources, start.resources);
        assert_eq!(next.buildings, start.buildings);
        assert_eq!(next.technologies, start.technologies);
        assert_eq!(next.loop_actions, start.loop_actions);
        assert_eq!(next.achievements.unlocked, start.achievements.unlocked);
        assert_eq!(next.achievements.stats.prestige_count, 1);
    }

    #[test]
    fn test_reborn_after_prestige() {
        let config = builtin_config();
        let mut state = fresh(&config);
        state.lifetime.insert("food".into(), 10_000.0);
        let mut rng = seeded_rng(8);

        let next = check_achievements(&config, &do_prestige(&config, &state, &mut rng));
        assert_eq!(next.resource("prestige"), 3.0);
        assert_eq!(next.achievement_level("reborn"), 1);
        assert!((next.achievement_multipliers.click_gain - 1.5).abs() < 1e-12);
    }
}

// =============================================================================
// Economy
// =============================================================================

mod economy {
    use super::*;

    #[test]
    fn test_third_mint_costs_sixteen_gold() {
        let config = tiny_config();
        let state = fresh(&config).with_building_count("mint", 3);
        let cost = building_cost(&config, &state, "mint");
        assert_eq!(cost["gold"], 16.0);
    }

    #[test]
    fn test_buying_walks_the_curve() {
        let config = tiny_config();
        let mut state = fresh(&config);
        let mut paid = Vec::new();
        for _ in 0..4 {
            let before = state.resource("gold");
            state = try_buy_building(&config, &state, "mint").unwrap();
            paid.push(before - state.resource("gold"));
        }
        assert_eq!(paid, vec![10.0, 12.0, 14.0, 16.0]);
        assert_eq!(state.building_count("mint"), 4);
    }

    #[test]
    fn test_production_is_linear_until_consumption_starves() {
        let config = tiny_config();
        let state = fresh(&config)
            .with_building_count("mint", 2)
            .with_resource("food", 10.0);
        let mut rng = seeded_rng(1);

        let next = tick(&config, &state, 4.0, 1, &mut rng);
        assert!((next.resource("gold") - (100.0 + 16.0)).abs() < 1e-9);
        assert!((next.resource("food") - 2.0).abs() < 1e-9);

        let starved = tick(&config, &next, 10.0, 2, &mut rng);
        assert_eq!(starved.resource("food"), 0.0);
    }
}

// =============================================================================
// Loop actions
// =============================================================================

mod loops {
    use super::*;

    #[test]
    fn test_drill_completes_after_ten_ticks() {
        let config = tiny_config();
        let mut rng = seeded_rng(2);
        let mut state = try_start_loop_action(&config, &fresh(&config), "drill").unwrap();

        for counter in 1..=9 {
            state = tick(&config, &state, 0.1, counter, &mut rng);
            assert_eq!(state.loop_action("drill").unwrap().total_loops_completed, 0);
        }
        state = tick(&config, &state, 0.1, 10, &mut rng);

        let entry = state.loop_action("drill").unwrap();
        assert_eq!(entry.total_loops_completed, 1);
        assert_eq!(entry.current_points, 0.0);
        assert!(entry.is_running());
        assert_eq!(state.resource("food"), 3.0);
        assert_eq!(state.achievements.stats.loops_completed, 1);
    }

    #[test]
    fn test_second_start_evicts_under_single_slot() {
        let config = builtin_config();
        let mut state = rich_state(&config, 1_000.0)
            .with_building_count("farm", 1)
            .with_building_count("library", 1)
            .with_tech_level("masonry", 1);
        state.loop_settings.max_concurrent_actions = 1;

        let state = try_start_loop_action(&config, &state, "gather_berries").unwrap();
        let state = try_start_loop_action(&config, &state, "chop_wood").unwrap();

        assert_eq!(state.active_loop_count(), 1);
        assert!(state.loop_action("chop_wood").unwrap().is_running());
        assert!(state.loop_action("gather_berries").unwrap().is_paused);
    }
}

// =============================================================================
// Persistence
// =============================================================================

mod saves {
    use super::*;

    #[test]
    fn test_import_rejects_other_version() {
        let config = builtin_config();
        let current = fresh(&config);
        let snapshot = current.clone();

        let mut old = current.clone();
        old.version = config.version + 1;
        let text = export(&old).unwrap();

        assert!(import(&config, &text).is_none());
        assert_eq!(current, snapshot);
    }

    #[test]
    fn test_export_import_after_play() {
        let config = builtin_config();
        let script = parse_script(
            "[Click, Click, Click, StartLoop(0), Tick(0.5), Tick(0.5), PerformAction(0), Tick(30.0)]",
        );
        let played = run_script(&config, &fresh(&config), &script, 12);

        let restored = import(&config, &export(&played).unwrap()).unwrap();
        assert_eq!(restored, played);
        let reloaded = persistence::deserialize(&config, &serialize(&played).unwrap()).unwrap();
        assert_eq!(reloaded, played);
    }

    #[test]
    fn test_garbage_import_is_none() {
        let config = builtin_config();
        assert!(import(&config, "not base64 at all!").is_none());
        assert!(import(&config, "").is_none());
    }
}

// =============================================================================
// Offline progress and full sessions
// =============================================================================

mod sessions {
    use super::*;

    #[test]
    fn test_catch_up_clamps_to_one_hour() {
        let config = tiny_config();
        let state = fresh(&config)
            .with_building_count("mint", 1)
            .with_resource("food", 1.0e6);
        let mut rng = seeded_rng(4);

        let next = catch_up(&config, &state, 24.0 * 3600.0, &mut rng);
        assert_eq!(next.t, 3_600_000);
        assert!((next.resource("gold") - (100.0 + 2.0 * 3600.0)).abs() < 1e-6);
    }

    #[test]
    fn test_first_click_notification_once() {
        let config = builtin_config();
        let script = parse_script("[Click, CheckAchievements, Click, CheckAchievements, CheckAchievements]");
        let state = run_script(&config, &fresh(&config), &script, 1);

        let pending: Vec<_> = pending_notifications(&state)
            .filter(|n| n.achievement_key == "first_click")
            .collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(state.achievement_level("first_click"), 1);
    }

    #[test]
    fn test_long_session_stays_sound() {
        let config = builtin_config();
        let mut sim = Simulation::new(config, 2024).unwrap();
        for i in 0..20_000u32 {
            if i % 7 == 0 {
                sim.apply(|c, s, _| kingdom_core::economy::click_action(c, s));
            }
            if i % 50 == 0 {
                sim.apply(|c, s, _| kingdom_core::economy::buy_building(c, s, "farm"));
                sim.apply(|c, s, _| kingdom_core::loop_actions::start_loop_action(c, s, "gather_berries"));
            }
            sim.step(0.1);
        }
        assert!(kingdom_core::simulation::check_invariants(sim.config(), sim.state()).is_empty());
        assert!(sim.state().achievements.stats.events_resolved > 0);
        assert!(sim.state().building_count("farm") > 0);
    }
}
