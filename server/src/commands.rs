//! Operator console commands for the headless server.

use warband_shared::{CombatantId, MapRef};

use crate::combat::AttackKind;
use crate::engine::Engine;

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was successful
    pub success: bool,
    /// Message to display to the operator
    pub message: String,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Parse and execute a console command.
/// Returns None if it's not a command (doesn't start with /)
pub fn parse_and_execute(content: &str, engine: &Engine) -> Option<CommandResult> {
    let body = content.trim().strip_prefix('/')?;

    let parts: Vec<&str> = body.split_whitespace().collect();
    if parts.is_empty() {
        return Some(CommandResult::error("Invalid command"));
    }

    let command = parts[0].to_lowercase();
    let args = &parts[1..];

    Some(match command.as_str() {
        "help" => cmd_help(),
        "mobs" => cmd_mobs(args, engine),
        "mob" => cmd_mob(args, engine),
        "hit" => cmd_hit(args, engine),
        "damage" | "dmg" => cmd_damage(args, engine),
        "harvest" => cmd_harvest(args, engine),
        "drops" => cmd_drops(engine),
        "pickup" => cmd_pickup(args, engine),
        "disable" => cmd_disable(args, engine),
        "time" => CommandResult::success(format!(
            "t={} ms, {} jobs pending",
            engine.now(),
            engine.pending_jobs()
        )),
        _ => CommandResult::error(format!("Unknown command: /{}", command)),
    })
}

/// `server:map`, or just `map` on server 1
fn parse_map(arg: &str) -> Option<MapRef> {
    match arg.split_once(':') {
        Some((server, map)) => Some(MapRef::new(server.parse().ok()?, map.parse().ok()?)),
        None => Some(MapRef::new(1, arg.parse().ok()?)),
    }
}

/// Map and handle from the first two arguments
fn parse_mob(args: &[&str]) -> Option<(MapRef, u32)> {
    let map = parse_map(args.first()?)?;
    let handle = args.get(1)?.parse().ok()?;
    Some((map, handle))
}

fn cmd_help() -> CommandResult {
    let mut help = String::from("Available commands:\n");
    help.push_str("  /help - Show this help message\n");
    help.push_str("  /time - Show simulation time and queue size\n");
    help.push_str("  /mobs [map] - List mobs\n");
    help.push_str("  /mob <map> <handle> - Show one mob\n");
    help.push_str("  /hit <character> <map> <handle> - Character attacks a mob\n");
    help.push_str("  /damage <map> <handle> <character> <amount> - Apply raw damage\n");
    help.push_str("  /harvest <character> <map> <handle> - Harvest a resource node\n");
    help.push_str("  /drops - List items on the ground\n");
    help.push_str("  /pickup <character> <entity> - Pick up a ground item\n");
    help.push_str("  /disable <map> <handle> - Stop a mob for good\n");
    CommandResult::success(help)
}

fn cmd_mobs(args: &[&str], engine: &Engine) -> CommandResult {
    let filter = match args.first() {
        Some(arg) => match parse_map(arg) {
            Some(map) => Some(map),
            None => return CommandResult::error("Invalid map"),
        },
        None => None,
    };

    let mut msg = String::from("Mobs:\n");
    for mob in engine.mobs() {
        if filter.is_some_and(|map| map != mob.map) {
            continue;
        }
        let name = engine.data().npc(mob.npc_id).map(|n| n.name.as_str()).unwrap_or("?");
        let state = mob.state();
        msg.push_str(&format!(
            "  [{}:{} #{}] {} {}/{} {:?}\n",
            mob.map.server, mob.map.map, mob.handle, name, state.health, state.max_health, state.phase
        ));
    }
    CommandResult::success(msg)
}

fn cmd_mob(args: &[&str], engine: &Engine) -> CommandResult {
    let Some((map, handle)) = parse_mob(args) else {
        return CommandResult::error("Usage: /mob <map> <handle>");
    };
    let mob = match engine.mob_by_handle(map, handle) {
        Ok(mob) => mob,
        Err(e) => return CommandResult::error(e.to_string()),
    };
    let state = mob.state();
    CommandResult::success(format!(
        "Mob #{} (NPC {}): pos=({:.1}, {:.1}) hp={}/{} mp={}/{} {:?} target={:?} moving={} observers={} attackers={}",
        mob.handle,
        mob.npc_id,
        state.position.x,
        state.position.z,
        state.health,
        state.max_health,
        state.mana,
        state.max_mana,
        state.phase,
        state.target,
        state.is_moving(),
        state.observers.len(),
        state.ledger.len()
    ))
}

fn cmd_hit(args: &[&str], engine: &Engine) -> CommandResult {
    let character: u64 = match args.first().and_then(|a| a.parse().ok()) {
        Some(id) => id,
        None => return CommandResult::error("Usage: /hit <character> <map> <handle>"),
    };
    let Some((map, handle)) = parse_mob(&args[1..]) else {
        return CommandResult::error("Usage: /hit <character> <map> <handle>");
    };
    match engine.attack_mob(character, map, handle, AttackKind::Basic) {
        Ok(0) => CommandResult::success("Missed"),
        Ok(damage) => CommandResult::success(format!("Hit mob #{} for {}", handle, damage)),
        Err(e) => CommandResult::error(e.to_string()),
    }
}

fn cmd_damage(args: &[&str], engine: &Engine) -> CommandResult {
    let usage = "Usage: /damage <map> <handle> <character> <amount>";
    let Some((map, handle)) = parse_mob(args) else {
        return CommandResult::error(usage);
    };
    let (Some(character), Some(amount)) = (
        args.get(2).and_then(|a| a.parse::<u64>().ok()),
        args.get(3).and_then(|a| a.parse::<u32>().ok()),
    ) else {
        return CommandResult::error(usage);
    };
    match engine.apply_damage(map, handle, CombatantId::Character(character), amount) {
        Ok(0) => CommandResult::success(format!("Mob #{} died", handle)),
        Ok(health) => CommandResult::success(format!("Mob #{} has {} HP left", handle, health)),
        Err(e) => CommandResult::error(e.to_string()),
    }
}

fn cmd_harvest(args: &[&str], engine: &Engine) -> CommandResult {
    let character: u64 = match args.first().and_then(|a| a.parse().ok()) {
        Some(id) => id,
        None => return CommandResult::error("Usage: /harvest <character> <map> <handle>"),
    };
    let Some((map, handle)) = parse_mob(&args[1..]) else {
        return CommandResult::error("Usage: /harvest <character> <map> <handle>");
    };
    match engine.harvest(map, handle, character) {
        Ok(count) => CommandResult::success(format!("Harvested {} items", count)),
        Err(e) => CommandResult::error(e.to_string()),
    }
}

fn cmd_drops(engine: &Engine) -> CommandResult {
    let mut drops = engine.world_items().snapshot();
    drops.sort_by_key(|item| item.entity_id);
    let mut msg = format!("{} items on the ground:\n", drops.len());
    for item in drops {
        msg.push_str(&format!(
            "  [{}] item {} x{} +{} at ({:.1}, {:.1}) owner={:?}\n",
            item.entity_id, item.item_id, item.quantity, item.plus, item.position.x, item.position.z, item.owner
        ));
    }
    CommandResult::success(msg)
}

fn cmd_pickup(args: &[&str], engine: &Engine) -> CommandResult {
    let (Some(character), Some(entity)) = (
        args.first().and_then(|a| a.parse::<u64>().ok()),
        args.get(1).and_then(|a| a.parse::<u64>().ok()),
    ) else {
        return CommandResult::error("Usage: /pickup <character> <entity>");
    };
    match engine.pickup_item(character, entity) {
        Ok(grant) => CommandResult::success(format!(
            "Picked up {}x item {} (+{})",
            grant.quantity, grant.item_id, grant.plus
        )),
        Err(e) => CommandResult::error(e.to_string()),
    }
}

fn cmd_disable(args: &[&str], engine: &Engine) -> CommandResult {
    let Some((map, handle)) = parse_mob(args) else {
        return CommandResult::error("Usage: /disable <map> <handle>");
    };
    match engine.disable(map, handle) {
        Ok(()) => CommandResult::success(format!("Mob #{} disabled", handle)),
        Err(e) => CommandResult::error(e.to_string()),
    }
}
