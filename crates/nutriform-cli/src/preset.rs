use nutriform_solver::Constraint;

use crate::input::NamedConstraint;

/// Adult daily intake targets (per day), with total food capped at 1 kg
pub fn daily_intake() -> Vec<NamedConstraint> {
    [
        ("Vitamin C (mg)", Some(45.0), None),
        ("Vitamin A retinol equivalents (ug)", Some(900.0), None),
        ("Protein (g)", Some(64.0), None),
        ("Zinc (Zn) (mg)", Some(14.0), Some(40.0)),
        ("Vitamin E (mg)", None, Some(300.0)),
        ("Vitamin D3 equivalents (ug)", None, Some(80.0)),
        ("Thiamin (B1) (mg)", Some(1.2), None),
        ("Selenium (Se) (ug)", Some(70.0), Some(400.0)),
        ("Riboflavin (B2) (mg)", Some(1.1), None),
        ("Phosphorus (P) (mg)", Some(1000.0), Some(4000.0)),
        ("Molybdenum (Mo) (ug)", Some(45.0), Some(2000.0)),
        ("Magnesium (Mg) (mg)", Some(400.0), None),
        ("Iron (Fe) (mg)", Some(8.0), Some(45.0)),
        ("Iodine (I) (ug)", Some(150.0), Some(1100.0)),
        ("Dietary folate equivalents (ug)", Some(400.0), Some(1000.0)),
        ("Copper (Cu) (mg)", None, Some(10.0)),
        ("Total dietary fibre (g)", Some(30.0), None),
        ("Sodium (Na) (mg)", Some(460.0), Some(2300.0)),
        ("grams", None, Some(1000.0)),
    ]
    .into_iter()
    .map(|(name, min, max)| NamedConstraint {
        name: name.to_string(),
        bounds: Constraint { min, max },
    })
    .collect()
}

/// Constraints the minimal relaxation stage keeps
pub fn essential() -> Vec<&'static str> {
    vec!["Protein (g)", "Total dietary fibre (g)", "Vitamin C (mg)", "grams"]
}
