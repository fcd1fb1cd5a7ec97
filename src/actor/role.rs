//! Role descriptors: what each stakeholder category may do and how it is
//! introduced to the reasoning provider.

use crate::model::StakeholderKind;

/// Actions any stakeholder may take.
pub const COMMON_ACTIONS: &[&str] = &[
    "wait",
    "ignore",
    "observe",
    "research",
    "send_message",
    "post_review",
    "complain",
    "criticize",
    "collaborate",
];

/// Data-driven description of a stakeholder category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDescriptor {
    /// Category described
    pub kind: StakeholderKind,
    /// Category-specific actions on top of [`COMMON_ACTIONS`]
    pub actions: &'static [&'static str],
    /// One-line persona used in decision prompts
    pub persona: &'static str,
}

static ROLES: [RoleDescriptor; 10] = [
    RoleDescriptor {
        kind: StakeholderKind::Customer,
        actions: &["buy", "sell", "cancel", "recommend"],
        persona: "You decide whether the product is worth your money and tell others what you think.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Competitor,
        actions: &["compete", "lower_price", "launch_feature", "acquire", "partner"],
        persona: "You defend your market position against this new entrant.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Investor,
        actions: &["invest", "sell", "due_diligence", "partner"],
        persona: "You allocate capital where you expect the best risk-adjusted return.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Regulator,
        actions: &["audit", "investigate", "fine", "approve", "regulate"],
        persona: "You protect the public by enforcing the rules that apply to this industry.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Employee,
        actions: &["build", "ship_feature", "flag_issue", "resign"],
        persona: "You build the product and care about the team you work with.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Partner,
        actions: &["partner", "integrate", "negotiate"],
        persona: "You look for integrations that benefit both sides.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Critic,
        actions: &["publish_critique"],
        persona: "You scrutinize claims and publish what you find.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Media,
        actions: &["publish_article", "interview"],
        persona: "You cover the stories your audience will care about.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Supplier,
        actions: &["supply", "negotiate", "raise_prices", "partner"],
        persona: "You sell infrastructure to the venture and want a durable contract.",
    },
    RoleDescriptor {
        kind: StakeholderKind::Advisor,
        actions: &["advise", "introduce", "partner"],
        persona: "You mentor the founders and open doors for them.",
    },
];

impl RoleDescriptor {
    /// Descriptor for a stakeholder category
    pub fn for_kind(kind: StakeholderKind) -> &'static RoleDescriptor {
        // ROLES covers every StakeholderKind in declaration order
        &ROLES[kind as usize]
    }

    /// Whether the category may perform an action
    pub fn permits(&self, action: &str) -> bool {
        COMMON_ACTIONS.contains(&action) || self.actions.contains(&action)
    }

    /// Every permitted action, specific ones first
    pub fn permitted_actions(&self) -> Vec<&'static str> {
        self.actions
            .iter()
            .chain(COMMON_ACTIONS.iter())
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_kinds() {
        for kind in StakeholderKind::ALL {
            assert_eq!(RoleDescriptor::for_kind(kind).kind, kind);
        }
    }

    #[test]
    fn test_only_investors_invest() {
        for kind in StakeholderKind::ALL {
            let allowed = RoleDescriptor::for_kind(kind).permits("invest");
            assert_eq!(allowed, kind == StakeholderKind::Investor, "{kind}");
        }
    }

    #[test]
    fn test_common_actions_everywhere() {
        for kind in StakeholderKind::ALL {
            let role = RoleDescriptor::for_kind(kind);
            assert!(role.permits("wait"));
            assert!(role.permits("send_message"));
            assert!(!role.permits("teleport"));
        }
    }
}
