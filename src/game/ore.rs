//! Ore nodes on the planet surface.

use nalgebra::{Point3, UnitVector3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::actions::ActionError;
use super::constants::gameplay::ORE_HALF_EXTENTS;
use super::inventory::{Inventory, ItemKind, OreKind};
use crate::config::{OreConfig, OreScatterConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct OreNode {
    pub id: u32,
    pub kind: OreKind,
    pub position: Point3<f32>,
    pub chunk_amount: u32,
}

/// Point where a box of half height `half_height` rests on the surface along `direction`.
pub fn surface_anchor(
    center: &Point3<f32>,
    radius: f32,
    direction: &UnitVector3<f32>,
    half_height: f32,
) -> Point3<f32> {
    center + direction.into_inner() * (radius + half_height)
}

/// Uniformly distributed direction on the unit sphere.
pub fn random_direction<R: Rng>(rng: &mut R) -> UnitVector3<f32> {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let phi: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    UnitVector3::new_unchecked(Vector3::new(r * phi.cos(), r * phi.sin(), z))
}

/// Builds ore nodes from hand-placed entries and seeded scatters.
/// Ids are assigned sequentially starting at `first_id`.
pub fn place_ores(
    center: &Point3<f32>,
    radius: f32,
    ores: &[OreConfig],
    scatters: &[OreScatterConfig],
    first_id: u32,
) -> Vec<OreNode> {
    let half_height = ORE_HALF_EXTENTS[1];
    let mut nodes = Vec::new();
    let mut next_id = first_id;

    for ore in ores {
        let Some(direction) = UnitVector3::try_new(Vector3::from(ore.direction), 1.0e-6) else {
            continue;
        };
        nodes.push(OreNode {
            id: next_id,
            kind: ore.kind,
            position: surface_anchor(center, radius, &direction, half_height),
            chunk_amount: ore.chunk_amount,
        });
        next_id += 1;
    }

    for scatter in scatters {
        let mut rng = StdRng::seed_from_u64(scatter.seed);
        for _ in 0..scatter.count {
            let direction = random_direction(&mut rng);
            nodes.push(OreNode {
                id: next_id,
                kind: scatter.kind,
                position: surface_anchor(center, radius, &direction, half_height),
                chunk_amount: scatter.chunk_amount,
            });
            next_id += 1;
        }
    }

    nodes
}

/// Checks the mining preconditions: pickaxe equipped and ore within `reach`.
pub fn check_mine(
    inventory: &Inventory,
    ore: &OreNode,
    player_position: &Point3<f32>,
    reach: f32,
) -> Result<(), ActionError> {
    if inventory.equipped() != Some(ItemKind::Pickaxe) {
        return Err(ActionError::NoPickaxeEquipped);
    }
    let distance = nalgebra::distance(player_position, &ore.position);
    if distance > reach {
        return Err(ActionError::OutOfReach {
            ore_id: ore.id,
            distance,
            reach,
        });
    }
    Ok(())
}

/// Credits the ore's chunks to `inventory`. The caller removes the node from the world.
pub fn mine(inventory: &mut Inventory, ore: &OreNode) {
    inventory.add_ore_chunks(ore.kind, ore.chunk_amount);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scatter(seed: u64, count: u32) -> OreScatterConfig {
        OreScatterConfig {
            kind: OreKind::Iron,
            count,
            seed,
            chunk_amount: 2,
        }
    }

    #[test]
    fn test_scatter_is_seeded_and_on_surface() {
        let center = Point3::new(1.0, 2.0, 3.0);
        let a = place_ores(&center, 20.0, &[], &[scatter(9, 16)], 0);
        let b = place_ores(&center, 20.0, &[], &[scatter(9, 16)], 0);
        let c = place_ores(&center, 20.0, &[], &[scatter(10, 16)], 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        for node in &a {
            let height = nalgebra::distance(&node.position, &center);
            assert_relative_eq!(height, 20.0 + ORE_HALF_EXTENTS[1], epsilon = 1e-3);
        }
    }

    #[test]
    fn test_ids_are_sequential_across_sources() {
        let placed = OreConfig {
            kind: OreKind::Gold,
            direction: [0.0, 0.0, 1.0],
            chunk_amount: 3,
        };
        let nodes = place_ores(&Point3::origin(), 10.0, &[placed], &[scatter(1, 2)], 100);
        let ids: Vec<u32> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![100, 101, 102]);
        assert_eq!(nodes[0].kind, OreKind::Gold);
        assert_relative_eq!(nodes[0].position, Point3::new(0.0, 0.0, 10.4), epsilon = 1e-5);
    }

    #[test]
    fn test_mining_requires_equipped_pickaxe_and_reach() {
        let ore = OreNode {
            id: 4,
            kind: OreKind::Copper,
            position: Point3::new(0.0, 10.0, 0.0),
            chunk_amount: 2,
        };
        let mut inventory = Inventory::new();
        let near = Point3::new(0.0, 11.5, 1.0);

        assert_eq!(check_mine(&inventory, &ore, &near, 3.0), Err(ActionError::NoPickaxeEquipped));

        inventory.give_pickaxe();
        inventory.select_slot(1).unwrap();
        assert_eq!(check_mine(&inventory, &ore, &near, 3.0), Err(ActionError::NoPickaxeEquipped));

        inventory.select_slot(0).unwrap();
        let far = Point3::new(0.0, 20.0, 0.0);
        assert!(matches!(
            check_mine(&inventory, &ore, &far, 3.0),
            Err(ActionError::OutOfReach { ore_id: 4, .. })
        ));

        check_mine(&inventory, &ore, &near, 3.0).unwrap();
        mine(&mut inventory, &ore);
        assert_eq!(inventory.ore_count(OreKind::Copper), 2);
    }
}
