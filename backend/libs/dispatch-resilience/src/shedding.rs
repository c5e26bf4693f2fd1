/// Greedy load shedding: drop the cheapest work until load is back under target
use crate::metrics::DecisionMetrics;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A unit of work the caller could drop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheddableItem {
    pub id: String,
    /// 1 is the most critical; larger values are cheaper to drop
    pub priority: u32,
    /// Fraction of total load this item accounts for
    pub load_contribution: f64,
}

impl SheddableItem {
    pub fn new(id: impl Into<String>, priority: u32, load_contribution: f64) -> Self {
        Self {
            id: id.into(),
            priority,
            load_contribution,
        }
    }

    /// Priority per unit of load shed. Items with no load use raw priority.
    pub fn shed_cost(&self) -> f64 {
        let priority = f64::from(self.priority);
        if self.load_contribution > 0.0 {
            priority / self.load_contribution
        } else {
            priority
        }
    }

    fn sheddable_load(&self) -> f64 {
        self.load_contribution.max(0.0)
    }

    fn reduces_load(&self) -> bool {
        self.load_contribution > 0.0
    }
}

/// Choose the items to drop, in shed order, so that load falls to `target_load`.
///
/// Nothing is shed when `current_load <= target_load`. Items that carry no load
/// always rank behind items that do, so they are only returned when every real
/// load reducer together cannot cover the deficit.
pub fn select_sheddable(items: &[SheddableItem], current_load: f64, target_load: f64) -> Vec<&str> {
    if current_load.is_nan() || target_load.is_nan() || current_load <= target_load {
        return Vec::new();
    }
    let deficit = current_load - target_load;

    let mut ordered: Vec<&SheddableItem> = items.iter().collect();
    ordered.sort_by(|a, b| {
        b.reduces_load()
            .cmp(&a.reduces_load())
            .then_with(|| a.shed_cost().total_cmp(&b.shed_cost()))
    });

    let mut shed = Vec::new();
    let mut shed_load = 0.0;
    for item in ordered {
        if shed_load >= deficit {
            break;
        }
        shed.push(item.id.as_str());
        shed_load += item.sheddable_load();
    }

    if shed_load < deficit {
        warn!(
            deficit,
            shed_load,
            items = items.len(),
            "Shedding every item does not reach target load"
        );
    } else {
        info!(deficit, shed_load, shed = shed.len(), "Load shedding selected items");
    }
    DecisionMetrics::record_shed(shed.len());

    shed
}
