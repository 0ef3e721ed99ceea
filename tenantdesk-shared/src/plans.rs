/// Subscription plan catalog
///
/// Maps each [`SubscriptionPlan`] to the quota ceilings a tenant receives
/// when it registers or changes plan. Ceilings are copied onto the tenant
/// row; later catalog changes do not touch existing tenants.
///
/// # Defaults
///
/// | Plan       | max_users | max_projects |
/// |------------|-----------|--------------|
/// | free       | 5         | 3            |
/// | pro        | 25        | 50           |
/// | enterprise | 1000      | 1000         |
///
/// # Overrides
///
/// Any value can be overridden from the environment:
///
/// ```text
/// PLAN__FREE__MAX_USERS=10
/// PLAN__PRO__MAX_PROJECTS=100
/// ```

use crate::models::tenant::SubscriptionPlan;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Failed to load plan catalog: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid limits for plan '{plan}': {reason}")]
    Invalid { plan: &'static str, reason: String },
}

/// Quota ceilings for one plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_users: i32,
    pub max_projects: i32,
}

/// Ceilings for every plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCatalog {
    pub free: PlanLimits,
    pub pro: PlanLimits,
    pub enterprise: PlanLimits,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self {
            free: PlanLimits {
                max_users: 5,
                max_projects: 3,
            },
            pro: PlanLimits {
                max_users: 25,
                max_projects: 50,
            },
            enterprise: PlanLimits {
                max_users: 1000,
                max_projects: 1000,
            },
        }
    }
}

impl PlanCatalog {
    /// Loads the catalog from the process environment (`PLAN__*`)
    pub fn from_env() -> Result<Self, PlanError> {
        Self::from_environment(config::Environment::with_prefix("PLAN"))
    }

    /// Loads the catalog with defaults layered under `env`
    pub fn from_environment(env: config::Environment) -> Result<Self, PlanError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder();

        for plan in [
            SubscriptionPlan::Free,
            SubscriptionPlan::Pro,
            SubscriptionPlan::Enterprise,
        ] {
            let limits = defaults.limits(plan);
            builder = builder
                .set_default(
                    format!("{}.max_users", plan.as_str()),
                    i64::from(limits.max_users),
                )?
                .set_default(
                    format!("{}.max_projects", plan.as_str()),
                    i64::from(limits.max_projects),
                )?;
        }

        let catalog: PlanCatalog = builder
            .add_source(env.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;

        catalog.validate()?;
        Ok(catalog)
    }

    /// Returns the ceilings for `plan`
    pub fn limits(&self, plan: SubscriptionPlan) -> PlanLimits {
        match plan {
            SubscriptionPlan::Free => self.free,
            SubscriptionPlan::Pro => self.pro,
            SubscriptionPlan::Enterprise => self.enterprise,
        }
    }

    fn validate(&self) -> Result<(), PlanError> {
        for plan in [
            SubscriptionPlan::Free,
            SubscriptionPlan::Pro,
            SubscriptionPlan::Enterprise,
        ] {
            let limits = self.limits(plan);
            // A tenant is created together with its admin, so zero users is unusable.
            if limits.max_users < 1 {
                return Err(PlanError::Invalid {
                    plan: plan.as_str(),
                    reason: "max_users must be at least 1".to_string(),
                });
            }
            if limits.max_projects < 0 {
                return Err(PlanError::Invalid {
                    plan: plan.as_str(),
                    reason: "max_projects must not be negative".to_string(),
                });
            }
        }
        Ok(())
    }
}
