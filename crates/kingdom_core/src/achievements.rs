//! Achievement evaluation, unlocks, rewards and notifications.
//!
//! Every check walks the whole table. Locked achievements (and repeatable
//! ones below their level cap) are re-evaluated; a newly complete one gains
//! exactly one level, queues one notification and applies its rewards.
//! Repeatable achievements scale every requirement by the next level, so
//! level `n + 1` needs `value * (n + 1)`.

use crate::actions::unlock_action;
use crate::data::{AchievementData, GameConfig, Operator, Requirement, RequirementKind, Reward, RewardKind};
use crate::state::{AchievementNotification, GameState, Timestamp};

/// Current measured value for a requirement, `None` for unknown kinds.
#[must_use]
pub fn requirement_current(config: &GameConfig, state: &GameState, req: &Requirement) -> Option<f64> {
    let target = req.target.as_str();
    let stats = &state.achievements.stats;
    let value = match req.kind {
        RequirementKind::Resource => state.resource(target),
        RequirementKind::Building if target == "*" => state.total_buildings() as f64,
        RequirementKind::Building => f64::from(state.building_count(target)),
        RequirementKind::Technology if target == "*" => {
            state.technologies.values().filter(|&&l| l > 0).count() as f64
        }
        RequirementKind::Technology => f64::from(state.tech_level(target)),
        RequirementKind::Action if target == "*" => stats.loops_completed as f64,
        RequirementKind::Action if config.loop_action(target).is_some() => state
            .loop_action(target)
            .map_or(0.0, |l| l.total_loops_completed as f64),
        RequirementKind::Action => stats.actions_used.get(target).copied().unwrap_or(0) as f64,
        RequirementKind::Event if target == "*" => stats.events_resolved as f64,
        RequirementKind::Event => stats.events_by_key.get(target).copied().unwrap_or(0) as f64,
        RequirementKind::Click => state.clicks as f64,
        RequirementKind::Prestige if target == "count" => f64::from(stats.prestige_count),
        RequirementKind::Prestige => state.resource(&config.prestige.resource),
        RequirementKind::Time => stats.play_time_secs,
        RequirementKind::Combo => target
            .split('+')
            .map(|part| combo_part(config, state, part.trim()))
            .fold(f64::INFINITY, f64::min),
        RequirementKind::Unknown => return None,
    };
    Some(if value.is_finite() { value } else { 0.0 })
}

fn combo_part(config: &GameConfig, state: &GameState, key: &str) -> f64 {
    if config.building(key).is_some() {
        f64::from(state.building_count(key))
    } else if config.is_resource(key) {
        state.resource(key)
    } else if config.technology(key).is_some() {
        f64::from(state.tech_level(key))
    } else {
        0.0
    }
}

fn compare(operator: Operator, current: f64, target: f64) -> Option<bool> {
    match operator {
        Operator::Gte => Some(current >= target),
        Operator::Gt => Some(current > target),
        Operator::Lte => Some(current <= target),
        Operator::Lt => Some(current < target),
        Operator::Eq => Some((current - target).abs() < f64::EPSILON),
        Operator::Unknown => None,
    }
}

/// Progress of one requirement in `0..=1` against `target`.
fn requirement_progress(config: &GameConfig, state: &GameState, req: &Requirement, target: f64) -> f64 {
    let Some(current) = requirement_current(config, state, req) else {
        return 0.0;
    };
    match compare(req.operator, current, target) {
        Some(true) => 1.0,
        Some(false) if matches!(req.operator, Operator::Gte | Operator::Gt) && target > 0.0 => {
            (current / target).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}

/// Requirement value scale for the next level.
fn next_tier(achievement: &AchievementData, level: u32) -> f64 {
    if achievement.repeatable {
        f64::from(level) + 1.0
    } else {
        1.0
    }
}

/// Whether a requirement holds at the given scale.
#[must_use]
pub fn requirement_met(config: &GameConfig, state: &GameState, req: &Requirement, scale: f64) -> bool {
    let Some(current) = requirement_current(config, state, req) else {
        return false;
    };
    compare(req.operator, current, req.value * scale).unwrap_or(false)
}

/// Average requirement progress towards the achievement's next level.
#[must_use]
pub fn achievement_progress(config: &GameConfig, state: &GameState, achievement: &AchievementData) -> f64 {
    let level = state.achievement_level(&achievement.key);
    if level >= achievement.level_cap() {
        return 1.0;
    }
    if achievement.requirements.is_empty() {
        return 0.0;
    }
    let scale = next_tier(achievement, level);
    let total: f64 = achievement
        .requirements
        .iter()
        .map(|req| requirement_progress(config, state, req, req.value * scale))
        .sum();
    total / achievement.requirements.len() as f64
}

/// Whether every requirement for the next level holds.
#[must_use]
pub fn is_complete(config: &GameConfig, state: &GameState, achievement: &AchievementData) -> bool {
    let scale = next_tier(achievement, state.achievement_level(&achievement.key));
    !achievement.requirements.is_empty()
        && achievement
            .requirements
            .iter()
            .all(|req| requirement_met(config, state, req, scale))
}

/// Achievements that may be displayed: not hidden, or already unlocked.
pub fn visible_achievements<'a>(
    config: &'a GameConfig,
    state: &'a GameState,
) -> impl Iterator<Item = &'a AchievementData> + 'a {
    config
        .achievements
        .iter()
        .filter(move |a| !a.hidden || state.achievement_level(&a.key) > 0)
}

/// Σ level × points over all achievements.
#[must_use]
pub fn total_points(config: &GameConfig, state: &GameState) -> u64 {
    config
        .achievements
        .iter()
        .map(|a| u64::from(state.achievement_level(&a.key)) * u64::from(a.points))
        .sum()
}

fn apply_reward(config: &GameConfig, state: &mut GameState, reward: &Reward, now: Timestamp) {
    let target = reward.target.as_str();
    match reward.kind {
        RewardKind::Resource if config.is_resource(target) => {
            state.add_resource(target, reward.value, false);
        }
        RewardKind::Multiplier if reward.value.is_finite() && reward.value > 0.0 => {
            let m = &mut state.achievement_multipliers;
            let factor = reward.value;
            match target.split_once(':') {
                None if target == "click" => m.click_gain *= factor,
                None if target == "cost" => m.cost *= factor,
                None if target == "production" => m.scale_production(None, factor),
                None if target == "consumption" => m.scale_consumption(None, factor),
                Some(("production", key)) if config.is_resource(key) => {
                    m.scale_production(Some(key), factor);
                }
                Some(("consumption", key)) if config.is_resource(key) => {
                    m.scale_consumption(Some(key), factor);
                }
                _ => tracing::warn!(
                    category = "validation",
                    op = "apply_reward",
                    reward_target = target,
                    "Unknown multiplier target"
                ),
            }
        }
        RewardKind::Unlock if config.action(target).is_some() => unlock_action(state, target, now),
        RewardKind::Cosmetic => {
            state.achievements.cosmetics.insert(reward.target.clone());
        }
        _ => {
            tracing::warn!(
                category = "validation",
                op = "apply_reward",
                kind = ?reward.kind,
                reward_target = target,
                "Reward skipped"
            );
        }
    }
}

fn queue_notification(config: &GameConfig, state: &mut GameState, key: &str, level: u32, now: Timestamp) {
    let queue = &mut state.achievements.notifications;
    queue.retain(|n| n.shown || n.achievement_key != key);
    queue.push_back(AchievementNotification {
        achievement_key: key.to_owned(),
        timestamp: now,
        level,
        shown: false,
    });
    while queue.len() > config.notifications.max_queued.max(1) {
        queue.pop_front();
    }
}

/// Achievement stage of the tick pipeline.
pub(crate) fn process_achievements(config: &GameConfig, state: &mut GameState, now: Timestamp) {
    for achievement in &config.achievements {
        let key = &achievement.key;
        let level = state.achievement_level(key);
        if level < achievement.level_cap() && is_complete(config, state, achievement) {
            let level = level + 1;
            state.achievements.unlocked.insert(key.clone(), level);
            queue_notification(config, state, key, level, now);
            for reward in &achievement.rewards {
                apply_reward(config, state, reward, now);
            }
            tracing::debug!(achievement = %key, level, "Achievement unlocked");
        }
        let progress = achievement_progress(config, state, achievement);
        state.achievements.progress.insert(key.clone(), progress);
    }
    state.achievements.total_points = total_points(config, state);
}

/// Re-evaluate every achievement against `state`.
#[must_use]
pub fn check_achievements(config: &GameConfig, state: &GameState) -> GameState {
    let mut next = state.clone();
    let now = next.t;
    process_achievements(config, &mut next, now);
    next
}

/// Notifications not yet displayed, oldest first.
pub fn pending_notifications(state: &GameState) -> impl Iterator<Item = &AchievementNotification> {
    state.achievements.notifications.iter().filter(|n| !n.shown)
}

/// Mark every queued notification as displayed.
#[must_use]
pub fn mark_notifications_shown(state: &GameState) -> GameState {
    let mut next = state.clone();
    for n in &mut next.achievements.notifications {
        n.shown = true;
    }
    next
}

/// Drop displayed notifications from the queue.
#[must_use]
pub fn clear_shown_notifications(state: &GameState) -> GameState {
    let mut next = state.clone();
    next.achievements.notifications.retain(|n| !n.shown);
    next
}
