/// Communication Policy Engine
///
/// Pure role-pair rules deciding who may open a conversation with whom.
/// Buyers and sellers never talk directly; an agent sits in the middle.
/// Checked on every write path that introduces a participant pair, not
/// only at the edge.
use crate::api::error::SystemError;
use crate::modules::conversation::schema::ConversationType;
use crate::modules::user::schema::UserRole;

pub const BUYER_SELLER_REASON: &str =
    "Communication between buyers and sellers is not allowed; use an agent";

/// Order-independent role-pair check. Allowed: buyer-agent, agent-seller,
/// agent-agent. Everything else is rejected.
pub fn is_allowed(sender: &UserRole, recipient: &UserRole) -> bool {
    matches!(
        (sender, recipient),
        (UserRole::Buyer, UserRole::Agent)
            | (UserRole::Agent, UserRole::Buyer)
            | (UserRole::Agent, UserRole::Seller)
            | (UserRole::Seller, UserRole::Agent)
            | (UserRole::Agent, UserRole::Agent)
    )
}

/// Guards conversation creation independently of the participant check.
pub fn is_valid_conversation_type(_type: &ConversationType) -> bool {
    matches!(_type, ConversationType::BuyerAgent | ConversationType::AgentSeller)
}

/// Resolves the conversation type implied by a role pair, or fails with the
/// policy reason. Agent-agent threads carry the buyer_agent type: there is
/// no seller side to them.
pub fn conversation_type_for(
    a: &UserRole,
    b: &UserRole,
) -> Result<ConversationType, SystemError> {
    if !is_allowed(a, b) {
        return Err(SystemError::policy_violation(BUYER_SELLER_REASON));
    }

    let _type = match (a, b) {
        (UserRole::Agent, UserRole::Seller) | (UserRole::Seller, UserRole::Agent) => {
            ConversationType::AgentSeller
        }
        _ => ConversationType::BuyerAgent,
    };

    debug_assert!(is_valid_conversation_type(&_type));
    Ok(_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buyer_seller_is_rejected_both_directions() {
        assert!(!is_allowed(&UserRole::Buyer, &UserRole::Seller));
        assert!(!is_allowed(&UserRole::Seller, &UserRole::Buyer));
    }

    #[test]
    fn same_side_pairs_are_rejected() {
        assert!(!is_allowed(&UserRole::Buyer, &UserRole::Buyer));
        assert!(!is_allowed(&UserRole::Seller, &UserRole::Seller));
    }

    #[test]
    fn agent_pairs_are_allowed() {
        assert!(is_allowed(&UserRole::Buyer, &UserRole::Agent));
        assert!(is_allowed(&UserRole::Agent, &UserRole::Buyer));
        assert!(is_allowed(&UserRole::Agent, &UserRole::Seller));
        assert!(is_allowed(&UserRole::Seller, &UserRole::Agent));
        assert!(is_allowed(&UserRole::Agent, &UserRole::Agent));
    }

    #[test]
    fn conversation_type_matches_role_pair() {
        assert_eq!(
            conversation_type_for(&UserRole::Buyer, &UserRole::Agent).unwrap(),
            ConversationType::BuyerAgent
        );
        assert_eq!(
            conversation_type_for(&UserRole::Agent, &UserRole::Buyer).unwrap(),
            ConversationType::BuyerAgent
        );
        assert_eq!(
            conversation_type_for(&UserRole::Seller, &UserRole::Agent).unwrap(),
            ConversationType::AgentSeller
        );
        assert_eq!(
            conversation_type_for(&UserRole::Agent, &UserRole::Agent).unwrap(),
            ConversationType::BuyerAgent
        );
    }

    #[test]
    fn conversation_type_for_buyer_seller_is_policy_violation() {
        let err = conversation_type_for(&UserRole::Buyer, &UserRole::Seller).unwrap_err();
        assert!(matches!(err, SystemError::PolicyViolation(_)));

        let err = conversation_type_for(&UserRole::Seller, &UserRole::Buyer).unwrap_err();
        assert!(matches!(err, SystemError::PolicyViolation(_)));
    }

    #[test]
    fn both_conversation_types_are_valid() {
        assert!(is_valid_conversation_type(&ConversationType::BuyerAgent));
        assert!(is_valid_conversation_type(&ConversationType::AgentSeller));
    }
}
