#![deny(warnings)]

//! Headless CLI: load content and a save, replay an offline gap, print a
//! status report, and write the save back.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use idle_core::{
    format_duration, format_number, ActivityDef, ActivityId, Catalog, Energy, EnergyId, Item,
    ItemId, Skill, SkillId, UpgradeDef, UpgradeId,
};
use idle_engine::{reconcile, register_player, Player};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    data_dir: Option<PathBuf>,
    save_path: PathBuf,
    offline_hours: f64,
    activity: Option<u32>,
}

fn parse_args() -> Args {
    let mut args = Args {
        data_dir: None,
        save_path: persistence::default_save_path(),
        offline_hours: 0.0,
        activity: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--data" => args.data_dir = it.next().map(PathBuf::from),
            "--save" => {
                if let Some(path) = it.next() {
                    args.save_path = PathBuf::from(path);
                }
            }
            "--offline-hours" => {
                args.offline_hours = it.next().and_then(|s| s.parse().ok()).unwrap_or(0.0)
            }
            "--activity" => args.activity = it.next().and_then(|s| s.parse().ok()),
            _ => {}
        }
    }
    args
}

/// Fallback content when no `--data` directory is given: one pool, two
/// skills, one coin, and the begging loop.
fn minimal_catalog() -> Catalog {
    let mut catalog = Catalog::default();
    catalog
        .energies
        .insert(EnergyId(0), Energy::new(EnergyId(0), "Energy", 10.0, 0.2));
    catalog.skills.insert(
        SkillId(0),
        Skill::new(SkillId(0), "Stamina", 10.0, 2.0, 1, 50),
    );
    catalog.skills.insert(
        SkillId(1),
        Skill::new(SkillId(1), "Begging", 10.0, 1.5, 1, 20),
    );
    catalog
        .items
        .insert(ItemId(0), Item::new(ItemId(0), "coin", 100.0));
    catalog.activities.insert(
        ActivityId(0),
        ActivityDef {
            id: ActivityId(0),
            name: "Begging".into(),
            output_item: Some("coin".into()),
            output_amount: 0.2,
            energy_type: "energy".into(),
            energy_drain_rate: 0.5,
            skill: Some("begging".into()),
            skill_exp_rate: 1.0,
            unlock_conditions: vec![],
            description: "Beg for coins.".into(),
            status_description: "Begging for coins".into(),
        },
    );
    catalog.upgrades.insert(
        UpgradeId(0),
        UpgradeDef {
            id: UpgradeId(0),
            name: "Rags".into(),
            cost_material: "coin".into(),
            cost: 0.0,
            max_purchases: 1,
            unlock_conditions: vec![],
            unlocks: vec![],
            effects: idle_core::EffectMap::new(),
            description: "Humble beginnings.".into(),
        },
    );
    catalog
}

fn print_status(player: &Player, catalog: &Catalog) {
    println!("{} the {}", player.display_name, player.title);
    println!(
        "offline for {}",
        format_duration(player.time_since_last_update)
    );
    match player.current_activity.and_then(|id| catalog.activities.get(&id)) {
        Some(activity) => println!("{}", activity.status_description),
        None => println!("Resting"),
    }
    for pool in player.energies.values() {
        println!(
            "{}: {} / {}",
            pool.name,
            format_number(pool.current_energy),
            format_number(pool.max_energy)
        );
    }
    for item in player.items.values() {
        let gained = if item.last_gained != 0.0 {
            format!(" ({:+})", item.last_gained)
        } else {
            String::new()
        };
        println!(
            "{}: {} / {}{}",
            item.name,
            format_number(item.amount),
            format_number(item.capacity),
            gained
        );
    }
    for skill in player.skills.values() {
        println!(
            "{}: level {} ({} exp)",
            skill.name,
            skill.current_level,
            format_number(skill.current_exp)
        );
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(
        data = ?args.data_dir,
        save = %args.save_path.display(),
        offline_hours = args.offline_hours,
        "starting CLI"
    );

    let catalog = match &args.data_dir {
        Some(dir) => data_pipeline::load_catalog(dir)
            .with_context(|| format!("loading content from {}", dir.display()))?,
        None => {
            let catalog = minimal_catalog();
            catalog.validate().context("built-in content is invalid")?;
            catalog
        }
    };

    let now = Utc::now();
    let mut player = if args.save_path.is_file() {
        persistence::load_player(&args.save_path, &catalog)
            .with_context(|| format!("loading save {}", args.save_path.display()))?
    } else {
        warn!(save = %args.save_path.display(), "no save found, registering a new player");
        register_player(&catalog, 1, "Wanderer", now)?
    };

    if let Some(id) = args.activity {
        idle_engine::change_activity(&mut player, &catalog, Some(ActivityId(id)), now)?;
    }
    // A requested offline gap rewinds the clock before reconciling, so a
    // fresh save can still demonstrate catch-up.
    if args.offline_hours > 0.0 {
        player.last_update_time =
            now - Duration::milliseconds((args.offline_hours * 3_600_000.0) as i64);
    }
    reconcile(&mut player, &catalog, now)?;

    print_status(&player, &catalog);
    persistence::save_player(&args.save_path, &player)?;
    Ok(())
}
