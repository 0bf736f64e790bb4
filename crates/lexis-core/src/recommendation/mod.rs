//! Migration recommendations.
//!
//! Compliance issues are turned into recommendations by a registry of pure
//! handler functions keyed by rule id. Recommendations are then partitioned
//! into a fixed sequence of batches:
//!
//! | Batch | Contents | Depends on |
//! |-------|----------|------------|
//! | terminology | legacy tag replacement | |
//! | auxiliary-assignment | auxiliary metadata and role tags | |
//! | tag-standardization | classification and marker tags | |
//! | cross-reference | reference repair, role alignment | terminology, auxiliary-assignment |
//! | manual-review | anything needing a human | |
//!
//! Every statement is built by [`StatementBuilder`], so a plan is fully
//! auditable before it runs. The plan digest covers every statement.
//!
//! # Example
//!
//! ```ignore
//! let engine = RecommendationEngine::new(RuleCatalog::default(), logger);
//! let plan = engine.create_plan(validator.results());
//! println!("{} recommendations, risk {}", plan.counts.total, plan.risk);
//! ```

mod batch;
mod custom;
mod engine;
mod handlers;
mod plan;
mod statement;
mod types;

// Statement types
pub use statement::{quote, Statement, StatementBuilder, StatementOp};

// Recommendation types
pub use types::{MigrationRecommendation, RecommendationCategory, SafetyLevel};

// Handlers
pub use handlers::{manual_review, Handler, HandlerContext, HandlerRegistry};

// Batching and planning
pub use batch::{create_batches, MigrationBatch};
pub use plan::{generate_plan_id, MigrationPlan, PlanCounts, RiskLevel};

// Custom rules
pub use custom::{
    CustomRuleDefinition, CustomRuleStore, RollbackStrategy, RulePattern, Transformation,
    TransformationKind,
};

pub use engine::RecommendationEngine;
