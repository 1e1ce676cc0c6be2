//! `terminus site:list` filtered down to Performance plans.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Terminus, TerminusError};

/// Plans that carry the traffic worth watching.
pub const PERFORMANCE_PLANS: [&str; 3] = ["Performance Large", "Performance 2XL", "Performance Extra Large"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Plan")]
    pub plan: String,
    #[serde(rename = "Framework", default)]
    pub framework: String,
}

impl SiteRecord {
    pub fn is_performance(&self) -> bool {
        PERFORMANCE_PLANS.contains(&self.plan.as_str())
    }
}

/// Parse `site:list --format=csv` output.
pub fn parse_site_list(csv_text: &str) -> Result<Vec<SiteRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    reader.deserialize().collect()
}

/// Keep only sites on a Performance plan, in listing order.
pub fn performance_sites(sites: Vec<SiteRecord>) -> Vec<SiteRecord> {
    sites.into_iter().filter(SiteRecord::is_performance).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum SiteListError {
    #[error(transparent)]
    Terminus(#[from] TerminusError),

    #[error("could not parse site list CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl Terminus {
    /// List every site visible to the logged-in user.
    pub async fn site_list(&self) -> Result<Vec<SiteRecord>, SiteListError> {
        let args = vec!["site:list".to_string(), "--format=csv".to_string()];
        let output = self.run(&args).await?;
        let sites = parse_site_list(&output.stdout)?;
        info!(count = sites.len(), "listed sites");
        Ok(sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Name,ID,Plan,Framework,Region,Owner,Created,Memberships,Is Frozen?
alpha,1111-aaaa,Performance Large,drupal8,United States,owner1,2020-01-01,team,false
beta,2222-bbbb,Basic,wordpress,United States,owner2,2021-01-01,team,false
gamma,3333-cccc,Performance Extra Large,wordpress,Canada,owner3,2022-01-01,team,false
delta,4444-dddd,\"Performance 2XL\",drupal8,Europe,owner4,2023-01-01,team,false
";

    #[test]
    fn test_filters_performance_plans() {
        let sites = parse_site_list(LISTING).unwrap();
        assert_eq!(sites.len(), 4);

        let perf = performance_sites(sites);
        let names: Vec<&str> = perf.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "gamma", "delta"]);
        assert_eq!(perf[2].plan, "Performance 2XL");
    }

    #[test]
    fn test_missing_optional_columns() {
        let sites = parse_site_list("Name,Plan\nsolo,Performance Large\n").unwrap();
        assert_eq!(sites[0].id, "");
        assert!(sites[0].is_performance());
    }

    #[test]
    fn test_missing_plan_column_is_an_error() {
        assert!(parse_site_list("Name,ID\nsolo,1\n").is_err());
    }
}
