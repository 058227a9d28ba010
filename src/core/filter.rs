use crate::domain::model::{Position, Profile, YearMonth};

pub use crate::domain::model::FilterCriteria;

/// 職稱關鍵字 + 單一職位最低年資的過濾器（純函式，無 I/O）
///
/// `today` is the month ongoing roles are measured up to; it is fixed at
/// construction so a run filters every profile against the same reference.
#[derive(Debug, Clone)]
pub struct TenureFilter {
    criteria: FilterCriteria,
    keyword: String,
    today: YearMonth,
}

impl TenureFilter {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self::with_reference(criteria, YearMonth::current())
    }

    pub fn with_reference(criteria: FilterCriteria, today: YearMonth) -> Self {
        let keyword = criteria.job_title.to_lowercase();
        Self {
            criteria,
            keyword,
            today,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn matches(&self, profile: &Profile) -> bool {
        let required_months = i64::from(self.criteria.min_years) * 12;

        let has_title = profile.positions.iter().any(|p| self.has_title(p));

        // 每個職位各自計算，不累加
        let has_experience = profile.positions.iter().any(|position| {
            position
                .duration_months(self.today)
                .is_some_and(|months| months >= 0 && months >= required_months)
        });

        has_title && has_experience
    }

    fn has_title(&self, position: &Position) -> bool {
        position.title.to_lowercase().contains(&self.keyword)
    }

    /// Keeps matching profiles, preserving their order.
    pub fn apply(&self, profiles: Vec<Profile>) -> Vec<Profile> {
        profiles
            .into_iter()
            .filter(|profile| {
                let keep = self.matches(profile);
                if !keep {
                    tracing::debug!(
                        "Discarding profile {} (title match: {})",
                        profile.id,
                        profile.positions.iter().any(|p| self.has_title(p))
                    );
                }
                keep
            })
            .collect()
    }
}

pub fn matches(profile: &Profile, criteria: &FilterCriteria, today: YearMonth) -> bool {
    TenureFilter::with_reference(criteria.clone(), today).matches(profile)
}
