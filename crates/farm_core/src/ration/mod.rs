//! Least-cost ration formulation.
//!
//! The herd's nutrient requirements come from breed lactation curves
//! parameterized by parity, weeks in milk, milk fat, body-weight ratio,
//! baseline diet energy density, and housing. The cheapest feed mix
//! meeting them is found with the embedded simplex solver; when no mix
//! exists, the target milk production is relaxed by 5% per attempt until
//! a feasible ration appears.

pub mod simplex;

use tracing::debug;

use crate::error::RationError;
use crate::io::config::{AnimalSection, FeedClass, FeedEntry, FeedSection, Housing};

use self::simplex::{Constraint, LpOutcome, Relation};

/// Upper bound on 5% milk-production relaxations before the herd
/// configuration is declared unsatisfiable.
pub const MAX_RELAXATIONS: u32 = 100;

/// One feed with its derived constraint coefficients.
#[derive(Clone, Debug)]
pub struct Feed {
    pub name: String,
    pub price: f64,
    pub limit: f64,
    pub fi: f64,
    pub rv: f64,
    pub ne: f64,
    pub rdp: f64,
    pub rup: f64,
}

impl Feed {
    fn from_entry(name: &str, entry: &FeedEntry) -> Self {
        let nutrition = &entry.nutrition;
        // degradable and undegradable protein estimated from rumen
        // degradable, total, and indigestible crude protein
        let nh3 = nutrition.cp * nutrition.rdp_fraction;
        let unavailable = match nutrition.class {
            FeedClass::Concentrate => 0.4 * nutrition.icp,
            FeedClass::Roughage => 0.7 * nutrition.icp,
        };
        Self {
            name: name.to_string(),
            price: entry.price,
            limit: entry.limit,
            fi: nutrition.fi,
            rv: nutrition.rv,
            ne: nutrition.ne,
            rdp: nh3 + 0.15 * nutrition.cp,
            rup: 0.87 * (nutrition.cp - nh3 - unavailable * nutrition.cp),
        }
    }
}

/// Merged farm-grown and purchased feed table, ordered by name.
#[derive(Clone, Debug)]
pub struct FeedCatalog {
    feeds: Vec<Feed>,
}

impl FeedCatalog {
    /// Merge the two feed tables; a purchased feed shadows a farm feed
    /// of the same name.
    pub fn from_config(section: &FeedSection) -> Self {
        let mut merged = section.farm_feed.clone();
        for (name, entry) in &section.purchased_feed {
            merged.insert(name.clone(), entry.clone());
        }
        let feeds = merged
            .iter()
            .map(|(name, entry)| Feed::from_entry(name, entry))
            .collect();
        Self { feeds }
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn names(&self) -> Vec<String> {
        self.feeds.iter().map(|feed| feed.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

/// Daily nutrient bounds for the herd: a fiber-intake ceiling and four
/// floors.
#[derive(Clone, Copy, Debug)]
pub struct Requirements {
    pub fi_max: f64,
    pub rv_min: f64,
    pub ne_min: f64,
    pub rdp_min: f64,
    pub rup_min: f64,
}

impl Requirements {
    /// Evaluate the lactation-curve requirement model at the given milk
    /// production multiplier.
    pub fn for_herd(animal: &AnimalSection, milk_production_multiplier: f64) -> Self {
        let parity = animal.parity;
        let wim = animal.weeks_in_milk;
        let amf = animal.average_milk_fat;
        let bwr = animal.body_weight_ratio;
        let base_ned = animal.base_diet_energy;

        // fiber intake capacity
        let fic = if parity > 1.0 {
            0.564 * (wim + 0.857).powf(0.360) * (-0.0186 * (wim + 0.857)).exp()
        } else {
            0.388 * (wim + 3.0).powf(0.588) * (-0.0277 * (wim + 3.0)).exp()
        };

        // base milk yield and fat from the breed lactation curves
        let base_my = if parity > 1.0 {
            33.95 * wim.powf(0.2208) * (-0.03395 * wim).exp()
        } else {
            24.12 * wim.powf(0.1782) * (-0.02095 * wim).exp()
        } * milk_production_multiplier;
        let base_mf = 1.4286 * amf * wim.powf(-0.24) * (0.016 * wim).exp();

        // body weight and its weekly change
        let body_weight = if parity > 1.0 {
            bwr * 690.0 * (wim + 1.57).powf(-0.0803) * (0.00720 * (wim + 1.57)).exp()
        } else {
            bwr * 567.0 * (wim + 1.71).powf(-0.0730) * (0.00869 * (wim + 1.71)).exp()
        };
        let body_weight_change = if wim < 56.0 {
            let prior_week = if parity > 1.0 {
                bwr * 690.0 * (wim + 0.57).powf(-0.0803) * (0.00720 * (wim + 0.57)).exp()
            } else {
                bwr * 567.0 * (wim + 0.71).powf(-0.730) * (0.00869 * (wim + 0.71)).exp()
            };
            (body_weight - prior_week) / 7.0
        } else {
            0.0
        };

        // energy value of deposited or mobilized tissue
        let condition_score = if wim < 11.0 { 3.4 } else { 5.0 };
        let tissue_energy = 0.5381 * condition_score + 3.2855;
        let me_body_change = if body_weight_change < 0.0 {
            tissue_energy * body_weight_change / 0.785 / 100.0
        } else {
            tissue_energy * body_weight_change / 0.75 / 100.0
        };

        // maintenance
        let shrunk_body_weight = 0.96 * body_weight;
        let me_maintenance = 0.073 * shrunk_body_weight.powf(0.75);
        let mp_maintenance = 3.8 * shrunk_body_weight.powf(0.75);

        // activity, by housing
        let (hours, position_changes, flat_km, slope_km) = match animal.housing {
            Housing::Barn => (12.0, 9.0, 0.5, 0.001),
            Housing::Drylot => (15.0, 9.0, 1.5, 0.001),
            Housing::Pasture => (16.0, 6.0, 1.0, 0.0),
        };
        let unshrunk = shrunk_body_weight / 0.96;
        let me_activity = (0.1 * hours * unshrunk
            + 0.062 * position_changes * unshrunk
            + 0.621 * flat_km * unshrunk
            + 6.69 * slope_km * unshrunk)
            / 1000.0;

        // lactation
        let me_milk = base_my * (0.3523 + 0.0962 * base_mf) / 0.644;
        let milk_protein_pct = 1.9 + 0.4 * base_mf;
        let mp_milk = 10.0 * milk_protein_pct * base_my / 0.65;

        let me_required = me_maintenance / 0.667 + me_activity / 0.667 + me_milk + me_body_change;
        let mp_required = mp_maintenance + mp_milk;

        // degradable/undegradable protein from estimated intake
        let base_med = 1.095 * base_ned + 0.751;
        let dry_matter_intake = me_required / base_med;
        let digestible_nutrients = 0.31 * base_ned + 0.2;
        let microbial_protein = 0.13 * digestible_nutrients * dry_matter_intake;

        Self {
            fi_max: 0.01025 * body_weight * fic,
            rv_min: 0.0,
            ne_min: base_ned * dry_matter_intake * (1.0 - 0.0206) - 0.7 * mp_required / 1000.0,
            rdp_min: microbial_protein / 0.9,
            rup_min: mp_required / 1000.0 - 0.8 * 0.8 * microbial_protein,
        }
    }
}

/// A formulated daily ration.
#[derive(Clone, Debug)]
pub struct Ration {
    /// Total feed cost per cow per day.
    pub cost: f64,
    /// kg of each catalog feed, in catalog order.
    pub quantities: Vec<(String, f64)>,
    /// Milk production multiplier the solve succeeded at.
    pub milk_production_multiplier: f64,
    /// Number of 5% relaxations taken before feasibility.
    pub relaxation_steps: u32,
}

/// Formulate the least-cost ration for the herd, relaxing milk
/// production by 5% per attempt until the program is feasible.
pub fn formulate(animal: &AnimalSection, catalog: &FeedCatalog) -> Result<Ration, RationError> {
    let feeds = catalog.feeds();
    let objective: Vec<f64> = feeds.iter().map(|feed| feed.price).collect();

    let mut multiplier = 1.0;
    for step in 0..MAX_RELAXATIONS {
        if step > 0 {
            multiplier *= 0.95;
        }
        let requirements = Requirements::for_herd(animal, multiplier);

        let mut constraints = vec![
            Constraint {
                coefficients: feeds.iter().map(|feed| feed.fi).collect(),
                relation: Relation::Le,
                rhs: requirements.fi_max,
            },
            Constraint {
                coefficients: feeds.iter().map(|feed| feed.rv).collect(),
                relation: Relation::Ge,
                rhs: requirements.rv_min,
            },
            Constraint {
                coefficients: feeds.iter().map(|feed| feed.ne).collect(),
                relation: Relation::Ge,
                rhs: requirements.ne_min,
            },
            Constraint {
                coefficients: feeds.iter().map(|feed| feed.rdp).collect(),
                relation: Relation::Ge,
                rhs: requirements.rdp_min,
            },
            Constraint {
                coefficients: feeds.iter().map(|feed| feed.rup).collect(),
                relation: Relation::Ge,
                rhs: requirements.rup_min,
            },
        ];
        for (index, feed) in feeds.iter().enumerate() {
            let mut coefficients = vec![0.0; feeds.len()];
            coefficients[index] = 1.0;
            constraints.push(Constraint {
                coefficients,
                relation: Relation::Le,
                rhs: feed.limit,
            });
        }

        match simplex::minimize(&objective, &constraints) {
            LpOutcome::Optimal { objective, values } => {
                return Ok(Ration {
                    cost: objective,
                    quantities: feeds
                        .iter()
                        .zip(values)
                        .map(|(feed, kg)| (feed.name.clone(), kg))
                        .collect(),
                    milk_production_multiplier: multiplier,
                    relaxation_steps: step,
                });
            }
            outcome => {
                debug!(step, multiplier, ?outcome, "ration infeasible, relaxing milk target");
            }
        }
    }

    Err(RationError::Exhausted {
        attempts: MAX_RELAXATIONS,
        multiplier,
    })
}
