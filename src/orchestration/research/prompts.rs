//! Research graph prompts
//!
//! Facts and plan each have a create and an update variant. The update
//! variants carry the previous artifact so the model revises rather than
//! starts over.

use crate::ai::{PromptBuilder, RenderedPrompt};
use crate::orchestration::team::Team;

pub const TASK_FACTS: &str = "research/task_facts";
pub const TASK_FACTS_UPDATE: &str = "research/task_facts_update";
pub const TASK_PLAN: &str = "research/task_plan";
pub const TASK_PLAN_UPDATE: &str = "research/task_plan_update";
pub const SUMMARIZE_FINDINGS: &str = "research/summarize_findings";

const FACT_HEADINGS: [&str; 4] = [
    "GIVEN OR VERIFIED FACTS",
    "FACTS TO LOOK UP",
    "FACTS TO DERIVE",
    "EDUCATED GUESSES",
];

/// Facts survey; the update variant is chosen once facts exist
pub fn task_facts(task: &str, old_facts: &str) -> RenderedPrompt {
    let headings = FACT_HEADINGS.iter().map(|h| h.to_string());

    if old_facts.trim().is_empty() {
        PromptBuilder::new()
            .text(
                "Below I will present you a request. Before we begin addressing the \
                 request, please answer the following pre-survey to the best of your \
                 ability. Keep in mind that you are an expert analyst with access to \
                 the company's sales data.",
            )
            .section("Request", task)
            .list("Answer under these headings", headings)
            .rules([
                "Do not include any other headings or sections",
                "Do not list next steps or plans yet",
            ])
            .render(TASK_FACTS)
    } else {
        PromptBuilder::new()
            .text(
                "As a reminder, we are working on the request below. It is clear we \
                 are not making as much progress as we would like, but we may have \
                 learned something new. Please rewrite the fact sheet, updating it to \
                 include anything new we have learned that may be helpful.",
            )
            .section("Request", task)
            .section("Current fact sheet", old_facts)
            .list("Keep these headings", headings)
            .rules([
                "Move educated guesses to verified facts once they are confirmed",
                "Add at least one new educated guess and explain its reasoning",
            ])
            .render(TASK_FACTS_UPDATE)
    }
}

/// Plan request; the update variant is chosen once a plan exists
pub fn task_plan(team: &Team, old_plan: &str) -> RenderedPrompt {
    if old_plan.trim().is_empty() {
        PromptBuilder::new()
            .text(
                "Fantastic. To address this request we have assembled the following team:",
            )
            .section("Team", team.members_string())
            .text(
                "Based on the team composition and the known and unknown facts, please \
                 devise a short bullet-point plan for addressing the original request.",
            )
            .rules([
                "Only involve the team members listed above",
                "Not every team member needs to be involved",
            ])
            .render(TASK_PLAN)
    } else {
        PromptBuilder::new()
            .text(
                "Please briefly explain what went wrong on this last run (the root \
                 cause of the failure), and then come up with a new plan that takes \
                 steps and includes hints to overcome prior challenges and especially \
                 avoids repeating the same mistakes.",
            )
            .section("Team", team.members_string())
            .section("Previous plan", old_plan)
            .rules([
                "Only involve the team members listed above",
                "State the root cause first, then the new bullet-point plan",
            ])
            .render(TASK_PLAN_UPDATE)
    }
}

/// Final answer over the whole conversation
pub fn summarize_findings(task: &str) -> RenderedPrompt {
    PromptBuilder::new()
        .text(
            "We are done working on the request below. Write the final answer from \
             the conversation above.",
        )
        .section("Request", task)
        .rules([
            "Report every figure with its unit and period",
            "Mention every file produced during the work by its file name",
            "If the request could not be fully answered, say what is missing",
        ])
        .render(SUMMARIZE_FINDINGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facts_template_selection() {
        let create = task_facts("Explain the drop", "");
        assert_eq!(create.template, TASK_FACTS);
        assert!(create.text.contains("Explain the drop"));
        assert!(create.text.contains("EDUCATED GUESSES"));

        let update = task_facts("Explain the drop", "GIVEN OR VERIFIED FACTS: sales fell");
        assert_eq!(update.template, TASK_FACTS_UPDATE);
        assert!(update.text.contains("sales fell"));
    }

    #[test]
    fn test_plan_template_selection() {
        let team = Team::research_default();
        let create = task_plan(&team, "   ");
        assert_eq!(create.template, TASK_PLAN);
        assert!(create.text.contains("quantitative_analysis_agent"));

        let update = task_plan(&team, "- load the data");
        assert_eq!(update.template, TASK_PLAN_UPDATE);
        assert!(update.text.contains("- load the data"));
    }
}
