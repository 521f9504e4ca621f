//! Stage-aware score validation. Pure; never touches tournament state.

use crate::models::{ScoreError, Stage};
use serde::{Deserialize, Serialize};

/// What is being scored. The final is scored set by set, then by tiebreak.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreContext {
    Plain,
    Group,
    Semi,
    FinalSet,
    FinalTiebreak,
}

impl ScoreContext {
    /// Context for a single games score in `stage`; a final maps to one of its sets.
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Plain => ScoreContext::Plain,
            Stage::Group => ScoreContext::Group,
            Stage::Semi => ScoreContext::Semi,
            Stage::Final => ScoreContext::FinalSet,
        }
    }

    fn rule(self) -> Rule {
        match self {
            ScoreContext::Plain => Rule {
                cap: 6,
                ties_allowed: true,
                tiebreak_at_cap: false,
            },
            ScoreContext::Group => Rule {
                cap: 7,
                ties_allowed: true,
                tiebreak_at_cap: true,
            },
            ScoreContext::Semi => Rule {
                cap: 10,
                ties_allowed: false,
                tiebreak_at_cap: true,
            },
            ScoreContext::FinalSet => Rule {
                cap: 7,
                ties_allowed: false,
                tiebreak_at_cap: true,
            },
            ScoreContext::FinalTiebreak => Rule {
                cap: 7,
                ties_allowed: false,
                tiebreak_at_cap: false,
            },
        }
    }
}

struct Rule {
    cap: u8,
    ties_allowed: bool,
    /// Reaching the cap is only legal one game ahead of `cap - 1`, and `cap - 1` all
    /// is unfinished.
    tiebreak_at_cap: bool,
}

/// Check a score against the rules of `context`.
///
/// | context | cap | ties | at cap |
/// |---|---|---|---|
/// | plain (King) | 6 | allowed | - |
/// | group | 7 | allowed except 6-6 | 7-6 only |
/// | semi | 10 | never | 10-9 only |
/// | final set | 7 | never | 7-6 only |
/// | final tiebreak | 7 | never | - |
pub fn validate_score(context: ScoreContext, score1: u8, score2: u8) -> Result<(), ScoreError> {
    let rule = context.rule();
    if score1 > rule.cap || score2 > rule.cap {
        return Err(ScoreError::ExceedsCap {
            cap: rule.cap,
            score1,
            score2,
        });
    }
    let low = rule.cap - 1;
    if rule.tiebreak_at_cap && score1 == low && score2 == low {
        return Err(ScoreError::UnresolvedTiebreak { score: low });
    }
    if score1 == score2 && !rule.ties_allowed {
        return Err(ScoreError::TieNotAllowed { score: score1 });
    }
    if rule.tiebreak_at_cap {
        let at_cap = score1 == rule.cap || score2 == rule.cap;
        let other = if score1 == rule.cap { score2 } else { score1 };
        if at_cap && other != low {
            return Err(ScoreError::InvalidTiebreakScore {
                cap: rule.cap,
                low,
                score1,
                score2,
            });
        }
    }
    Ok(())
}
