//! Prompts for the orchestration and answer-formatting passes

use crate::intent::RoutingDecision;

/// System prompt of the orchestration model
pub const ORCHESTRATOR_SYSTEM_PROMPT: &str = "You are a coordinator that dispatches customer requests \
to the appropriate services with the call_services tool, then returns the detailed data they provide.";

/// System prompt of the answer-formatting pass
pub const ASSISTANT_SYSTEM_PROMPT: &str = "You are the customer-service assistant of JTCG Shop, \
helping customers with monitor arms, wall mounts and other workspace accessories.";

/// Orchestration request built from the routing decision
pub fn orchestration_prompt(decision: &RoutingDecision, query: &str, categories: &str) -> String {
    format!(
        "Intent analysis result:\n\
         - Selected agent: {agent}\n\
         - Confidence: {confidence:.2}\n\
         - Reasoning: {reasoning}\n\n\
         Original user request: {query}\n\n\
         Turn this request into the appropriate service calls. Several related services may be \
         called to give a more complete answer.\n\n\
         Available services:\n{categories}\n",
        agent = decision.selected_agent,
        confidence = decision.confidence,
        reasoning = decision.reasoning,
    )
}

/// Style contract applied to the final answer
pub fn answer_prompt(query: &str, raw_result: &str) -> String {
    format!(
        "## Response rules\n\
         - Language: reply in the language of the user's latest message\n\
         - Brevity: condense the answer to about 50 words, phrased as a suggestion, then offer a \
         follow-up question the user can ask to go further\n\
         - Grounded: only use data returned by the tools, never guess or invent\n\
         - Next step: always end with one concrete action or question the user can take right away\n\n\
         ## Edge cases\n\
         - Unrelated questions: politely steer back to what the shop can help with\n\
         - Missing data: say it \"cannot be confirmed at the moment\" and offer an alternative\n\
         - Only use image links provided by the tools, never fetch other images\n\n\
         User question: {query}\n\
         Response: {raw_result}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Category, RoutingDecision, ScoreMap};

    #[test]
    fn test_orchestration_prompt_contents() {
        let decision = RoutingDecision::matched(Category::OrderQuery, 0.8567, ScoreMap::new());
        let prompt = orchestration_prompt(&decision, "我想查詢訂單", "- order_query_agent: 我要查詢訂單");

        assert!(prompt.contains("Selected agent: order_query_agent"));
        assert!(prompt.contains("Confidence: 0.86"));
        assert!(prompt.contains("Original user request: 我想查詢訂單"));
        assert!(prompt.ends_with("- order_query_agent: 我要查詢訂單\n"));
    }

    #[test]
    fn test_answer_prompt_embeds_query_and_result() {
        let prompt = answer_prompt("運費多少", "滿千免運");
        assert!(prompt.contains("User question: 運費多少"));
        assert!(prompt.contains("Response: 滿千免運"));
        assert!(prompt.contains("about 50 words"));
    }
}
