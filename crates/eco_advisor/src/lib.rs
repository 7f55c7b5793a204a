//! # eco_advisor
//!
//! Sizing recommendations and sustainability scoring for EcoArch.
//!
//! ## Features
//!
//! - Questionnaire answers with lenient normalisation
//! - Deterministic cart recommendation (HA replicas, load balancer, database, bucket)
//! - Monthly energy and carbon estimates per region
//! - A to E sobriety grade and low-carbon region suggestions
//!
//! ## Example
//!
//! ```rust
//! use eco_advisor::{calculate_total_emissions, generate, Environment, WizardAnswers};
//!
//! let answers = WizardAnswers::default().with_environment(Environment::Dev);
//! let cart = generate(&answers);
//! let kg = calculate_total_emissions(&cart, "europe-west9");
//! assert!(kg > 0.0);
//! ```

pub mod answers;
pub mod carbon;
pub mod recommend;

pub use answers::{AppType, Criticality, Environment, Traffic, WizardAnswers, Workload};
pub use carbon::{
    calculate_sobriety_score, calculate_total_emissions, get_green_alternative, machine_profile,
    CarbonModel, CarbonTier, MachineProfile, SobrietyGrade,
};
pub use recommend::{generate, Recommendation, RecommendationEngine};
