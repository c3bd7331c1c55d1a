use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reconcile::DailyRecord;
use crate::store::SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Markers,
    Activity,
    Calories,
    Macros,
    Food,
}

impl Table {
    /// Load order.
    pub const ALL: [Table; 5] = [
        Table::Markers,
        Table::Activity,
        Table::Calories,
        Table::Macros,
        Table::Food,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Table::Markers => "markers",
            Table::Activity => "activity",
            Table::Calories => "calories",
            Table::Macros => "macros",
            Table::Food => "food",
        }
    }

    /// Data columns, `date` first, in the order rows are bound for insert.
    #[must_use]
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Markers => &["date", "weight", "body_fat"],
            Table::Activity => &[
                "date",
                "steps",
                "sleep_hours",
                "exercise_minutes",
                "exercise_count",
            ],
            Table::Calories => &[
                "date",
                "food_calories",
                "exercise_calories",
                "calorie_budget",
                "tdee",
            ],
            Table::Macros => &["date", "protein_grams", "carbs_grams", "fiber_grams"],
            Table::Food => &[
                "date",
                "food_name",
                "meal",
                "quantity",
                "units",
                "calories",
                "nutrients",
            ],
        }
    }

    /// Food is append-only; every other table holds one row per date.
    #[must_use]
    pub fn has_unique_date(self) -> bool {
        !matches!(self, Table::Food)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a reconciler combines a new value with one already present for the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Replace; the last source processed wins.
    Overwrite,
    /// Add to a running sum.
    Accumulate,
}

/// A measured column in one of the unique-date tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Weight,
    BodyFat,
    Steps,
    SleepHours,
    ExerciseMinutes,
    ExerciseCount,
    FoodCalories,
    ExerciseCalories,
    CalorieBudget,
    Tdee,
    ProteinGrams,
    CarbsGrams,
    FiberGrams,
}

impl Field {
    #[must_use]
    pub fn table(self) -> Table {
        match self {
            Field::Weight | Field::BodyFat => Table::Markers,
            Field::Steps | Field::SleepHours | Field::ExerciseMinutes | Field::ExerciseCount => {
                Table::Activity
            }
            Field::FoodCalories | Field::ExerciseCalories | Field::CalorieBudget | Field::Tdee => {
                Table::Calories
            }
            Field::ProteinGrams | Field::CarbsGrams | Field::FiberGrams => Table::Macros,
        }
    }

    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Field::Weight => "weight",
            Field::BodyFat => "body_fat",
            Field::Steps => "steps",
            Field::SleepHours => "sleep_hours",
            Field::ExerciseMinutes => "exercise_minutes",
            Field::ExerciseCount => "exercise_count",
            Field::FoodCalories => "food_calories",
            Field::ExerciseCalories => "exercise_calories",
            Field::CalorieBudget => "calorie_budget",
            Field::Tdee => "tdee",
            Field::ProteinGrams => "protein_grams",
            Field::CarbsGrams => "carbs_grams",
            Field::FiberGrams => "fiber_grams",
        }
    }

    /// Exercise sessions are summed per date; everything else is a point reading.
    #[must_use]
    pub fn policy(self) -> MergePolicy {
        match self {
            Field::ExerciseMinutes | Field::ExerciseCount => MergePolicy::Accumulate,
            _ => MergePolicy::Overwrite,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A row of a canonical table as bound to / read from the store.
pub trait TableRow: Sized {
    const TABLE: Table;

    fn date(&self) -> &str;

    /// Values in [`Table::columns`] order.
    fn to_values(&self) -> Vec<SqlValue>;

    /// Inverse of `to_values`; missing trailing cells read as null.
    fn from_values(values: &[SqlValue]) -> Self;
}

fn cell(values: &[SqlValue], idx: usize) -> &SqlValue {
    values.get(idx).unwrap_or(&SqlValue::Null)
}

fn cell_text(values: &[SqlValue], idx: usize) -> String {
    match cell(values, idx) {
        SqlValue::Text(s) => s.clone(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Null => String::new(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn int_as_f64(v: Option<i64>) -> Option<f64> {
    v.map(|i| i as f64)
}

fn f64_as_int(v: f64) -> i64 {
    v.trunc() as i64
}

// --- Markers ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub date: String,
    pub weight: Option<f64>,
    pub body_fat: Option<f64>,
}

impl DailyRecord for MarkerRecord {
    fn with_date(date: String) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    fn field(&self, field: Field) -> Option<f64> {
        match field {
            Field::Weight => self.weight,
            Field::BodyFat => self.body_fat,
            _ => None,
        }
    }

    fn set_field(&mut self, field: Field, value: f64) -> bool {
        match field {
            Field::Weight => self.weight = Some(value),
            Field::BodyFat => self.body_fat = Some(value),
            _ => return false,
        }
        true
    }
}

impl TableRow for MarkerRecord {
    const TABLE: Table = Table::Markers;

    fn date(&self) -> &str {
        &self.date
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            self.date.as_str().into(),
            self.weight.into(),
            self.body_fat.into(),
        ]
    }

    fn from_values(values: &[SqlValue]) -> Self {
        Self {
            date: cell_text(values, 0),
            weight: cell(values, 1).as_f64(),
            body_fat: cell(values, 2).as_f64(),
        }
    }
}

// --- Activity ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub date: String,
    pub steps: Option<i64>,
    pub sleep_hours: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub exercise_count: Option<i64>,
}

impl DailyRecord for ActivityRecord {
    fn with_date(date: String) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    fn field(&self, field: Field) -> Option<f64> {
        match field {
            Field::Steps => int_as_f64(self.steps),
            Field::SleepHours => self.sleep_hours,
            Field::ExerciseMinutes => self.exercise_minutes,
            Field::ExerciseCount => int_as_f64(self.exercise_count),
            _ => None,
        }
    }

    fn set_field(&mut self, field: Field, value: f64) -> bool {
        match field {
            Field::Steps => self.steps = Some(f64_as_int(value)),
            Field::SleepHours => self.sleep_hours = Some(value),
            Field::ExerciseMinutes => self.exercise_minutes = Some(value),
            Field::ExerciseCount => self.exercise_count = Some(f64_as_int(value)),
            _ => return false,
        }
        true
    }
}

impl TableRow for ActivityRecord {
    const TABLE: Table = Table::Activity;

    fn date(&self) -> &str {
        &self.date
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            self.date.as_str().into(),
            self.steps.into(),
            self.sleep_hours.into(),
            self.exercise_minutes.into(),
            self.exercise_count.into(),
        ]
    }

    fn from_values(values: &[SqlValue]) -> Self {
        Self {
            date: cell_text(values, 0),
            steps: cell(values, 1).as_i64(),
            sleep_hours: cell(values, 2).as_f64(),
            exercise_minutes: cell(values, 3).as_f64(),
            exercise_count: cell(values, 4).as_i64(),
        }
    }
}

// --- Calories ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalorieRecord {
    pub date: String,
    pub food_calories: Option<f64>,
    pub exercise_calories: Option<f64>,
    pub calorie_budget: Option<f64>,
    pub tdee: Option<f64>,
}

impl DailyRecord for CalorieRecord {
    fn with_date(date: String) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    fn field(&self, field: Field) -> Option<f64> {
        match field {
            Field::FoodCalories => self.food_calories,
            Field::ExerciseCalories => self.exercise_calories,
            Field::CalorieBudget => self.calorie_budget,
            Field::Tdee => self.tdee,
            _ => None,
        }
    }

    fn set_field(&mut self, field: Field, value: f64) -> bool {
        match field {
            Field::FoodCalories => self.food_calories = Some(value),
            Field::ExerciseCalories => self.exercise_calories = Some(value),
            Field::CalorieBudget => self.calorie_budget = Some(value),
            Field::Tdee => self.tdee = Some(value),
            _ => return false,
        }
        true
    }
}

impl TableRow for CalorieRecord {
    const TABLE: Table = Table::Calories;

    fn date(&self) -> &str {
        &self.date
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            self.date.as_str().into(),
            self.food_calories.into(),
            self.exercise_calories.into(),
            self.calorie_budget.into(),
            self.tdee.into(),
        ]
    }

    fn from_values(values: &[SqlValue]) -> Self {
        Self {
            date: cell_text(values, 0),
            food_calories: cell(values, 1).as_f64(),
            exercise_calories: cell(values, 2).as_f64(),
            calorie_budget: cell(values, 3).as_f64(),
            tdee: cell(values, 4).as_f64(),
        }
    }
}

// --- Macros ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub date: String,
    pub protein_grams: Option<f64>,
    pub carbs_grams: Option<f64>,
    pub fiber_grams: Option<f64>,
}

impl DailyRecord for MacroRecord {
    fn with_date(date: String) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    fn field(&self, field: Field) -> Option<f64> {
        match field {
            Field::ProteinGrams => self.protein_grams,
            Field::CarbsGrams => self.carbs_grams,
            Field::FiberGrams => self.fiber_grams,
            _ => None,
        }
    }

    fn set_field(&mut self, field: Field, value: f64) -> bool {
        match field {
            Field::ProteinGrams => self.protein_grams = Some(value),
            Field::CarbsGrams => self.carbs_grams = Some(value),
            Field::FiberGrams => self.fiber_grams = Some(value),
            _ => return false,
        }
        true
    }
}

impl TableRow for MacroRecord {
    const TABLE: Table = Table::Macros;

    fn date(&self) -> &str {
        &self.date
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            self.date.as_str().into(),
            self.protein_grams.into(),
            self.carbs_grams.into(),
            self.fiber_grams.into(),
        ]
    }

    fn from_values(values: &[SqlValue]) -> Self {
        Self {
            date: cell_text(values, 0),
            protein_grams: cell(values, 1).as_f64(),
            carbs_grams: cell(values, 2).as_f64(),
            fiber_grams: cell(values, 3).as_f64(),
        }
    }
}

// --- Food ---

/// One logged food item. Several may share a date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub date: String,
    pub food_name: String,
    pub meal: String,
    pub quantity: Option<f64>,
    pub units: Option<String>,
    pub calories: Option<f64>,
    /// Nutrient name → amount. Nutrients the export left blank are absent.
    pub nutrients: BTreeMap<String, f64>,
}

impl FoodEntry {
    #[must_use]
    pub fn nutrients_json(&self) -> String {
        serde_json::to_string(&self.nutrients).unwrap_or_else(|_| "{}".to_string())
    }

    /// Lenient inverse of [`FoodEntry::nutrients_json`]; bad JSON yields an empty map.
    #[must_use]
    pub fn parse_nutrients(text: &str) -> BTreeMap<String, f64> {
        if text.trim().is_empty() {
            return BTreeMap::new();
        }
        serde_json::from_str(text).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "ignoring unparsable nutrients");
            BTreeMap::new()
        })
    }
}

impl TableRow for FoodEntry {
    const TABLE: Table = Table::Food;

    fn date(&self) -> &str {
        &self.date
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            self.date.as_str().into(),
            self.food_name.as_str().into(),
            self.meal.as_str().into(),
            self.quantity.into(),
            self.units.clone().into(),
            self.calories.into(),
            self.nutrients_json().into(),
        ]
    }

    fn from_values(values: &[SqlValue]) -> Self {
        let units = Some(cell_text(values, 4)).filter(|u| !u.is_empty());
        Self {
            date: cell_text(values, 0),
            food_name: cell_text(values, 1),
            meal: cell_text(values, 2),
            quantity: cell(values, 3).as_f64(),
            units,
            calories: cell(values, 5).as_f64(),
            nutrients: Self::parse_nutrients(&cell_text(values, 6)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_belong_to_their_tables() {
        for field in [Field::Weight, Field::BodyFat] {
            assert_eq!(field.table(), Table::Markers);
        }
        assert_eq!(Field::ExerciseCount.table(), Table::Activity);
        assert_eq!(Field::Tdee.table(), Table::Calories);
        assert_eq!(Field::FiberGrams.table(), Table::Macros);
    }

    #[test]
    fn test_every_field_column_is_a_table_column() {
        let all = [
            Field::Weight,
            Field::BodyFat,
            Field::Steps,
            Field::SleepHours,
            Field::ExerciseMinutes,
            Field::ExerciseCount,
            Field::FoodCalories,
            Field::ExerciseCalories,
            Field::CalorieBudget,
            Field::Tdee,
            Field::ProteinGrams,
            Field::CarbsGrams,
            Field::FiberGrams,
        ];
        for field in all {
            assert!(
                field.table().columns().contains(&field.column()),
                "{field} missing from {}",
                field.table()
            );
        }
    }

    #[test]
    fn test_merge_policies() {
        assert_eq!(Field::ExerciseMinutes.policy(), MergePolicy::Accumulate);
        assert_eq!(Field::ExerciseCount.policy(), MergePolicy::Accumulate);
        assert_eq!(Field::Weight.policy(), MergePolicy::Overwrite);
        assert_eq!(Field::Steps.policy(), MergePolicy::Overwrite);
    }

    #[test]
    fn test_set_field_rejects_foreign_fields() {
        let mut m = MarkerRecord::with_date("2024-11-15".into());
        assert!(m.set_field(Field::Weight, 180.2));
        assert!(!m.set_field(Field::Steps, 1000.0));
        assert_eq!(m.weight, Some(180.2));
    }

    #[test]
    fn test_activity_integer_fields_truncate() {
        let mut a = ActivityRecord::with_date("2024-11-15".into());
        a.set_field(Field::Steps, 8123.9);
        assert_eq!(a.steps, Some(8123));
        assert_eq!(a.field(Field::Steps), Some(8123.0));
    }

    #[test]
    fn test_table_row_values_match_columns() {
        let a = ActivityRecord {
            date: "2024-11-15".into(),
            steps: Some(9000),
            sleep_hours: Some(7.5),
            exercise_minutes: None,
            exercise_count: Some(0),
        };
        let values = a.to_values();
        assert_eq!(values.len(), Table::Activity.columns().len());
        assert_eq!(ActivityRecord::from_values(&values), a);
    }

    #[test]
    fn test_food_entry_values_round_trip() {
        let mut nutrients = BTreeMap::new();
        nutrients.insert("protein".to_string(), 12.5);
        let entry = FoodEntry {
            date: "2024-11-01".into(),
            food_name: "Eggs".into(),
            meal: "Breakfast".into(),
            quantity: Some(2.0),
            units: Some("Each".into()),
            calories: Some(140.0),
            nutrients,
        };
        let values = entry.to_values();
        assert_eq!(values[6], SqlValue::Text(r#"{"protein":12.5}"#.into()));
        assert_eq!(FoodEntry::from_values(&values), entry);
    }

    #[test]
    fn test_parse_nutrients_lenient() {
        assert!(FoodEntry::parse_nutrients("not json").is_empty());
        assert!(FoodEntry::parse_nutrients("").is_empty());
        assert_eq!(FoodEntry::parse_nutrients(r#"{"fat":3}"#)["fat"], 3.0);
    }
}
