//! Prompt templates for the bundled strategies.
//!
//! Every template shares the same response format and input sections; only
//! the system role, the focus instructions and the description guidance
//! differ.

use crate::models::{AuditInput, QaPair};

/// Focus-specific parts of a prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    /// System message.
    pub system: &'static str,
    /// What to look for and how.
    pub instructions: &'static str,
    /// What each finding's description must cover.
    pub description_guide: &'static str,
}

pub const GENERAL: PromptTemplate = PromptTemplate {
    system: "You are an expert Solidity smart contract auditor.",
    instructions: r#"Perform a deep, adversarial review of the smart contracts below and report true security vulnerabilities, logic bugs, centralization risks and inefficiencies.

## Instructions
1. Analyze each contract thoroughly.
2. Extract the invariants that must always hold.
3. Simulate adversarial behavior: reentrancy (cross-function, cross-contract), flash loan and oracle manipulation, front-running, privilege escalation, malicious token callbacks.
4. Consider: access control, integer overflow/underflow, denial of service, unchecked external calls, timestamp dependence, improper error handling, inheritance mistakes, missing validation, upgradeability hazards, economic logic flaws, gas inefficiencies.
5. Do not report files that do not exist."#,
    description_guide: "Detailed explanation including how the vulnerability could be exploited and a recommended fix",
};

pub const REENTRANCY: PromptTemplate = PromptTemplate {
    system: "You are an expert Solidity smart contract auditor specializing in reentrancy vulnerabilities.",
    instructions: r#"Focus exclusively on reentrancy: classic, cross-function, cross-contract, read-only, and callback-based (ERC777/ERC721/ERC1155 hooks).

## Instructions
1. Map every external call (call, transfer, send, token transfers, interface calls).
2. For each call, list the state read before it and written after it.
3. Flag state changes after external calls, checks performed after effects, missing reentrancy guards, unprotected callbacks and state shared between functions without a guard.
4. Assess the impact: can funds be drained, state be corrupted, or access control be bypassed?"#,
    description_guide: "Where the external call occurs, what state is modified after it, the concrete attack path, and a recommended fix",
};

pub const FLASH_LOAN: PromptTemplate = PromptTemplate {
    system: "You are an expert Solidity smart contract auditor specializing in flash loan and economic manipulation attacks.",
    instructions: r#"Focus exclusively on vulnerabilities exploitable with large, temporary capital: price oracle manipulation, liquidity pool manipulation, collateral ratio manipulation, invariant-breaking arbitrage and economic logic flaws.

## Instructions
1. Identify operations that depend on token prices, exchange rates, reserves, balances or collateral ratios.
2. For each, determine whether a flash-loaned position could move that value within one transaction.
3. Identify the economic invariants (supply equals balances, collateral covers debt, pool invariants) and check whether they can be broken.
4. Describe the borrow, manipulate, profit and repay phases of any viable attack."#,
    description_guide: "Which value is manipulated, the borrow/manipulate/profit/repay sequence, the estimated impact, and a recommended fix (TWAP, delays, bounds)",
};

pub const ACCESS_CONTROL: PromptTemplate = PromptTemplate {
    system: "You are an expert Solidity smart contract auditor specializing in access control and privilege escalation.",
    instructions: r#"Focus exclusively on authorization: missing or incorrect permission checks, privilege escalation, role-management flaws, exposed owner/admin functions, initializer and upgrade authorization, proxy pattern issues.

## Instructions
1. List privileged operations: administration, fund movement, minting/burning, configuration changes, role grants and revocations.
2. For each, identify the access control mechanism (onlyOwner, onlyRole, custom checks, multisig) and verify it is present and correct.
3. Check initializers, ownership transfer and role administration for takeover paths.
4. Check tx.origin usage and functions that should be internal but are public or external."#,
    description_guide: "Which function lacks or misapplies authorization, who can call it, what an attacker gains, and a recommended fix",
};

const SEVERITY_LEVELS: &str = r#"## Severity Levels
- Critical: Protocol-wide loss of funds or permanent takeover.
- High: Can directly cause loss of funds or catastrophic failure.
- Medium: Can cause disruption, moderate loss, or partial compromise.
- Low: Minor issue, edge case, or inefficiency.
- Info: Best-practice or optimization suggestion."#;

/// Build the full user prompt for `template` over `input`.
pub fn render(template: &PromptTemplate, input: &AuditInput) -> String {
    let mut prompt = String::new();

    prompt.push_str(template.instructions);
    prompt.push_str("\n\n");
    prompt.push_str(SEVERITY_LEVELS);
    prompt.push_str("\n\n");

    prompt.push_str("## Response Format\n");
    prompt.push_str("Return only a JSON object of this shape:\n");
    prompt.push_str(&format!(
        r#"{{"findings": [{{"title": "Clear, concise title", "description": "{}", "severity": "Critical|High|Medium|Low|Info", "locations": ["path/to/affected/file.sol"]}}]}}"#,
        template.description_guide
    ));
    prompt.push_str("\nReturn {\"findings\": []} if nothing qualifies.\n\n");

    prompt.push_str("## Smart Contracts to Audit\n```solidity\n");
    prompt.push_str(&input.contracts);
    prompt.push_str("\n```\n\n");

    if !input.docs.is_empty() {
        prompt.push_str("## Documentation\n");
        prompt.push_str(&input.docs);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format_additional_docs(input.additional_docs.as_deref()));
    prompt.push_str(&format_additional_links(&input.additional_links));
    prompt.push_str(&format_qa_responses(&input.qa_responses));

    prompt
}

/// Format Q&A pairs as a prompt section; empty when there are none.
pub fn format_qa_responses(qa_responses: &[QaPair]) -> String {
    if qa_responses.is_empty() {
        return String::new();
    }

    let mut section = String::from("## Q&A Information\n");
    for qa in qa_responses {
        section.push_str(&format!("Q: {}\nA: {}\n\n", qa.question, qa.answer));
    }
    section
}

/// Format reference links as a prompt section; empty when there are none.
pub fn format_additional_links(links: &[String]) -> String {
    if links.is_empty() {
        return String::new();
    }

    let mut section = String::from("## Additional References\n");
    for link in links {
        section.push_str(&format!("- {}\n", link));
    }
    section.push('\n');
    section
}

/// Format free-text documentation as a prompt section; empty when absent.
pub fn format_additional_docs(docs: Option<&str>) -> String {
    match docs {
        Some(docs) if !docs.trim().is_empty() => {
            format!("## Additional Documentation\n{}\n\n", docs)
        }
        _ => String::new(),
    }
}
