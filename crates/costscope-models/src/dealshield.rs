use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const CONSERVATIVE_ROW: &str = "conservative";
pub const UGLY_ROW: &str = "ugly";
pub const BASE_SCENARIO: &str = "base";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransformOp {
    Multiply,
    Add,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub op: TransformOp,
    pub value: Decimal,
}

impl Transform {
    /// Apply to `input`. Returns None on decimal overflow.
    pub fn apply(&self, input: Decimal) -> Option<Decimal> {
        match self.op {
            TransformOp::Multiply => input.checked_mul(self.value),
            TransformOp::Add => input.checked_add(self.value),
        }
    }

    /// Whether this transform pushes a value in the `adverse` direction.
    pub fn is_adverse(&self, adverse: Direction) -> bool {
        match (self.op, adverse) {
            (TransformOp::Multiply, Direction::Higher) => self.value > Decimal::ONE,
            (TransformOp::Multiply, Direction::Lower) => {
                self.value < Decimal::ONE && self.value >= Decimal::ZERO
            }
            (TransformOp::Add, Direction::Higher) => self.value > Decimal::ZERO,
            (TransformOp::Add, Direction::Lower) => self.value < Decimal::ZERO,
        }
    }
}

/// Which way a metric moves when the deal gets worse.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Higher,
    Lower,
}

impl Direction {
    /// True when `candidate` is at least as adverse as `reference`.
    pub fn at_least_as_adverse(&self, candidate: Decimal, reference: Decimal) -> bool {
        match self {
            Direction::Higher => candidate >= reference,
            Direction::Lower => candidate <= reference,
        }
    }
}

/// A single named, resolvable numeric driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tile {
    pub tile_id: String,
    pub label: String,
    /// Dotted path into a calculation result.
    pub metric_ref: String,
    #[serde(default)]
    pub transform: Option<Transform>,
    /// Additional transforms, applied after `transform`, left to right.
    #[serde(default)]
    pub transforms: Vec<Transform>,
    #[serde(default)]
    pub adverse: Direction,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl Tile {
    pub fn transform_chain(&self) -> Vec<Transform> {
        self.transform
            .iter()
            .copied()
            .chain(self.transforms.iter().copied())
            .collect()
    }

    pub fn is_driver(&self) -> bool {
        self.transform.is_some() || !self.transforms.is_empty()
    }
}

/// A named scenario built by applying its tiles' transforms to the base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedRow {
    pub row_id: String,
    pub label: String,
    #[serde(default)]
    pub apply_tiles: Vec<String>,
    /// Tiles layered after `apply_tiles`.
    #[serde(default)]
    pub plus_tiles: Vec<String>,
}

impl DerivedRow {
    /// Every tile this row stresses, in application order.
    pub fn stress_tiles(&self) -> impl Iterator<Item = &str> {
        self.apply_tiles
            .iter()
            .chain(self.plus_tiles.iter())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TileProfile {
    pub id: String,
    pub tiles: Vec<Tile>,
    pub rows: Vec<DerivedRow>,
}

impl TileProfile {
    pub fn tile(&self, tile_id: &str) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.tile_id == tile_id)
    }

    pub fn row(&self, row_id: &str) -> Option<&DerivedRow> {
        self.rows.iter().find(|r| r.row_id == row_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverNote {
    pub tile_id: String,
    pub headline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MostLikelyWrong {
    pub tile_id: String,
    pub text: String,
    pub why: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub tile_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionGroup {
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedFlag {
    pub tile_id: String,
    pub text: String,
}

/// Narrative content bound 1:1 to a tile profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentProfile {
    pub id: String,
    pub tile_profile_id: String,
    #[serde(default)]
    pub drivers: Vec<DriverNote>,
    #[serde(default)]
    pub most_likely_wrong: Vec<MostLikelyWrong>,
    #[serde(default)]
    pub question_groups: Vec<QuestionGroup>,
    #[serde(default)]
    pub red_flags: Vec<RedFlag>,
}

impl ContentProfile {
    /// Every tile id this content refers to, with the section it appears in.
    pub fn tile_refs(&self) -> Vec<(&'static str, &str)> {
        let mut refs: Vec<(&'static str, &str)> = Vec::new();
        refs.extend(self.drivers.iter().map(|d| ("drivers", d.tile_id.as_str())));
        refs.extend(
            self.most_likely_wrong
                .iter()
                .map(|m| ("most_likely_wrong", m.tile_id.as_str())),
        );
        for group in &self.question_groups {
            refs.extend(
                group
                    .questions
                    .iter()
                    .map(|q| ("question_groups", q.tile_id.as_str())),
            );
        }
        refs.extend(self.red_flags.iter().map(|r| ("red_flags", r.tile_id.as_str())));
        refs
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOperator {
    Lt,
    Le,
    Gt,
    Ge,
}

impl TriggerOperator {
    pub fn fires(&self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            TriggerOperator::Lt => value < threshold,
            TriggerOperator::Le => value <= threshold,
            TriggerOperator::Gt => value > threshold,
            TriggerOperator::Ge => value >= threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrimaryControl {
    pub tile_id: String,
    pub metric_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollapseTrigger {
    pub metric_ref: String,
    pub threshold: Decimal,
    pub operator: TriggerOperator,
}

/// Headroom fractions separating the flex bands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlexCalibration {
    pub tight_max: Decimal,
    pub moderate_max: Decimal,
}

/// Decision Insurance policy bound 1:1 to a tile profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionPolicy {
    pub id: String,
    pub tile_profile_id: String,
    pub primary_control: PrimaryControl,
    pub collapse_trigger: CollapseTrigger,
    pub flex_calibration: FlexCalibration,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlexBand {
    Tight,
    Moderate,
    Comfortable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrimaryControlVariable {
    pub tile_id: String,
    pub label: String,
    pub metric_ref: String,
    pub base_value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FirstBreakCondition {
    Breaks {
        scenario_id: String,
        metric_ref: String,
        value: Decimal,
        threshold: Decimal,
        operator: TriggerOperator,
    },
    Holds {
        metric_ref: String,
        scenarios_checked: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlexBeforeBreak {
    pub band: FlexBand,
    /// Relative distance between the base metric and the collapse threshold.
    pub headroom: Decimal,
}

/// Headline "what matters most" block derived from a decision policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionInsuranceProvenance {
    pub status: PolicyStatus,
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub primary_control_variable: Option<PrimaryControlVariable>,
    #[serde(default)]
    pub first_break_condition: Option<FirstBreakCondition>,
    #[serde(default)]
    pub flex_before_break: Option<FlexBeforeBreak>,
}

impl DecisionInsuranceProvenance {
    pub fn unavailable(policy_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            status: PolicyStatus::Unavailable,
            policy_id,
            reason: Some(reason.into()),
            primary_control_variable: None,
            first_break_condition: None,
            flex_before_break: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Complete,
    BaseOnly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CellSource {
    BaseResult,
    ScenarioSnapshot,
    SensitivityBlock,
    BaseFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellProvenance {
    pub source: CellSource,
    pub metric_ref: String,
    #[serde(default)]
    pub transforms_applied: Vec<Transform>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellExplain {
    pub reason: String,
    pub remediation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    pub tile_id: String,
    pub value: Decimal,
    pub coverage: Coverage,
    pub provenance: CellProvenance,
    #[serde(default)]
    pub explain: Option<CellExplain>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub tile_id: String,
    pub label: String,
    pub metric_ref: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioRow {
    pub scenario_id: String,
    pub label: String,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageSummary {
    pub complete: usize,
    pub base_only: usize,
}

/// An optional tile left out because its base value is null for this result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OmittedColumn {
    pub tile_id: String,
    pub metric_ref: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableProvenance {
    pub profile_id: String,
    #[serde(default)]
    pub content_profile_id: Option<String>,
    pub coverage: CoverageSummary,
    #[serde(default)]
    pub omitted_columns: Vec<OmittedColumn>,
    pub decision_insurance: DecisionInsuranceProvenance,
}

/// The DealShield comparison table for one result and one tile profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioTable {
    pub request_id: String,
    pub profile_id: String,
    pub columns: Vec<Column>,
    pub rows: Vec<ScenarioRow>,
    pub provenance: TableProvenance,
    /// Excluded from determinism comparisons.
    pub generated_at: DateTime<Utc>,
}

impl ScenarioTable {
    pub fn row(&self, scenario_id: &str) -> Option<&ScenarioRow> {
        self.rows.iter().find(|r| r.scenario_id == scenario_id)
    }
}

impl ScenarioRow {
    pub fn cell(&self, tile_id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.tile_id == tile_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn transform_apply() {
        let mul = Transform {
            op: TransformOp::Multiply,
            value: dec!(1.10),
        };
        let add = Transform {
            op: TransformOp::Add,
            value: dec!(0.01),
        };
        assert_eq!(mul.apply(dec!(100)), Some(dec!(110.00)));
        assert_eq!(add.apply(dec!(0.065)), Some(dec!(0.075)));
    }

    #[test]
    fn transform_adverse_direction() {
        let up = Transform {
            op: TransformOp::Multiply,
            value: dec!(1.10),
        };
        let down = Transform {
            op: TransformOp::Multiply,
            value: dec!(0.90),
        };
        assert!(up.is_adverse(Direction::Higher));
        assert!(!up.is_adverse(Direction::Lower));
        assert!(down.is_adverse(Direction::Lower));
    }

    #[test]
    fn tile_transform_chain_order() {
        let tile: Tile = toml::from_str(
            r#"
tile_id = "cost"
label = "Cost"
metric_ref = "construction_costs.hard_costs"
transform = { op = "multiply", value = 1.1 }
transforms = [{ op = "add", value = 5 }]
"#,
        )
        .unwrap();
        let chain = tile.transform_chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].op, TransformOp::Multiply);
        assert_eq!(chain[1].op, TransformOp::Add);
        assert!(tile.required);
        assert_eq!(tile.adverse, Direction::Higher);
    }

    #[test]
    fn trigger_operator_fires() {
        assert!(TriggerOperator::Lt.fires(dec!(1.1), dec!(1.2)));
        assert!(!TriggerOperator::Lt.fires(dec!(1.2), dec!(1.2)));
        assert!(TriggerOperator::Le.fires(dec!(1.2), dec!(1.2)));
        assert!(TriggerOperator::Gt.fires(dec!(3), dec!(2)));
    }

    #[test]
    fn first_break_is_tagged() {
        let holds = FirstBreakCondition::Holds {
            metric_ref: "ownership_analysis.debt_metrics.calculated_dscr".to_string(),
            scenarios_checked: 3,
        };
        let json = serde_json::to_value(&holds).unwrap();
        assert_eq!(json["status"], "holds");
    }

    #[test]
    fn row_stress_tiles_apply_then_plus() {
        let row = DerivedRow {
            row_id: "ugly".to_string(),
            label: "Ugly".to_string(),
            apply_tiles: vec!["a".to_string()],
            plus_tiles: vec!["b".to_string()],
        };
        assert_eq!(row.stress_tiles().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
