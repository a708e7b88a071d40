//! Shared catalog fixture for unit tests.

use idle_core::{
    ActivityDef, ActivityId, Attribute, Catalog, Effect, EffectMap, Energy, EnergyCost, EnergyId,
    Item, ItemId, ItemStack, ModifierKind, Skill, SkillId, StatKey, TaskDef, TaskId, UpgradeDef,
    UpgradeId,
};

fn effect(kind: ModifierKind, value: f64) -> Effect {
    Effect { kind, value }
}

fn effects(entries: &[(&str, Attribute, ModifierKind, f64)]) -> EffectMap {
    entries
        .iter()
        .map(|(target, attr, kind, value)| (StatKey::new(target, *attr), effect(*kind, *value)))
        .collect()
}

/// A small but complete content set: one energy pool, three skills, two
/// items, two activities, five upgrades, one task.
pub fn catalog() -> Catalog {
    let mut catalog = Catalog::default();

    catalog
        .energies
        .insert(EnergyId(0), Energy::new(EnergyId(0), "Energy", 10.0, 1.0));

    catalog.skills.insert(
        SkillId(0),
        Skill::new(SkillId(0), "Stamina", 10.0, 2.0, 1, 50),
    );
    catalog.skills.insert(
        SkillId(1),
        Skill::new(SkillId(1), "Begging", 10.0, 1.5, 1, 10),
    );
    let mut woodcutting = Skill::new(SkillId(2), "Woodcutting", 10.0, 1.5, 1, 10);
    woodcutting.effects = effects(&[("wood", Attribute::Gain, ModifierKind::Increase, 2.0)]);
    catalog.skills.insert(SkillId(2), woodcutting);

    catalog
        .items
        .insert(ItemId(0), Item::new(ItemId(0), "coin", 100.0));
    catalog
        .items
        .insert(ItemId(1), Item::new(ItemId(1), "wood", 50.0));

    catalog.activities.insert(
        ActivityId(0),
        ActivityDef {
            id: ActivityId(0),
            name: "Begging".into(),
            output_item: Some("coin".into()),
            output_amount: 0.5,
            energy_type: "energy".into(),
            energy_drain_rate: 2.0,
            skill: Some("begging".into()),
            skill_exp_rate: 1.0,
            unlock_conditions: vec![],
            description: "Beg for coins.".into(),
            status_description: "Begging for coins".into(),
        },
    );
    catalog.activities.insert(
        ActivityId(1),
        ActivityDef {
            id: ActivityId(1),
            name: "Chopping".into(),
            output_item: Some("wood".into()),
            output_amount: 1.0,
            energy_type: "energy".into(),
            energy_drain_rate: 1.0,
            skill: Some("woodcutting".into()),
            skill_exp_rate: 0.5,
            unlock_conditions: vec!["shoes".parse().unwrap()],
            description: "Chop firewood.".into(),
            status_description: "Chopping firewood".into(),
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
            effects: EffectMap::new(),
            description: "Humble beginnings.".into(),
        },
    );
    catalog.upgrades.insert(
        UpgradeId(1),
        UpgradeDef {
            id: UpgradeId(1),
            name: "Bigger Pouch".into(),
            cost_material: "coin".into(),
            cost: 10.0,
            max_purchases: 5,
            unlock_conditions: vec![],
            unlocks: vec![],
            effects: effects(&[("coin", Attribute::Capacity, ModifierKind::Increase, 5.0)]),
            description: "Holds more coins.".into(),
        },
    );
    catalog.upgrades.insert(
        UpgradeId(2),
        UpgradeDef {
            id: UpgradeId(2),
            name: "Old Shoes".into(),
            cost_material: "coin".into(),
            cost: 20.0,
            max_purchases: 1,
            unlock_conditions: vec![],
            unlocks: vec!["shoes".into()],
            effects: EffectMap::new(),
            description: "Opens up the woods.".into(),
        },
    );
    catalog.upgrades.insert(
        UpgradeId(3),
        UpgradeDef {
            id: UpgradeId(3),
            name: "Cart".into(),
            cost_material: "coin".into(),
            cost: 50.0,
            max_purchases: 1,
            unlock_conditions: vec!["shoes".parse().unwrap(), "level.stamina.2".parse().unwrap()],
            unlocks: vec![],
            effects: effects(&[("wood", Attribute::Capacity, ModifierKind::Multiplier, 2.0)]),
            description: "Haul more wood.".into(),
        },
    );
    catalog.upgrades.insert(
        UpgradeId(4),
        UpgradeDef {
            id: UpgradeId(4),
            name: "Blessing".into(),
            cost_material: "coin".into(),
            cost: 30.0,
            max_purchases: 1,
            unlock_conditions: vec![],
            unlocks: vec![],
            effects: effects(&[(
                "bigger pouch",
                Attribute::Effects,
                ModifierKind::Multiplier,
                2.0,
            )]),
            description: "Doubles the pouch's blessing.".into(),
        },
    );

    catalog.tasks.insert(
        TaskId(0),
        TaskDef {
            id: TaskId(0),
            name: "Sell Firewood".into(),
            outputs: vec![ItemStack {
                item: "coin".into(),
                amount: 10.0,
            }],
            costs: vec![ItemStack {
                item: "wood".into(),
                amount: 5.0,
            }],
            energy_costs: vec![EnergyCost {
                energy: "energy".into(),
                amount: 2.0,
            }],
            unlock_conditions: vec![],
            unlocks: vec!["market".into()],
            effects: EffectMap::new(),
            description: "Trade wood for coins.".into(),
        },
    );

    catalog
        .validate()
        .unwrap_or_else(|e| panic!("fixture catalog invalid: {e}"));
    catalog
}
