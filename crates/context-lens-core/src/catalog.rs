//! Built-in scenario configurations and demo document catalog.
//!
//! The catalog content is tuned to the demo trigger table in
//! [`crate::scoring::TriggerTable::demo`]: budget figures are written as
//! whole `$N million` amounts, and the people, dates, and venue the
//! triggers look for all appear verbatim.

use serde::Serialize;

use crate::models::{Document, Scenario};

/// Static description and system prompt of a [`Scenario`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    pub id: Scenario,
    pub title: &'static str,
    pub description: &'static str,
    pub long_description: &'static str,
    pub system_prompt: &'static str,
    pub suggestions: &'static [&'static str],
    pub suggestion_description: &'static str,
}

static SCENARIOS: [ScenarioConfig; 4] = [
    ScenarioConfig {
        id: Scenario::Normal,
        title: "Normal Chat",
        description: "A standard conversation with the model.",
        long_description: "Chat with the model directly. Every reply is generated from the system prompt, the full conversation history, and your latest message.",
        system_prompt: "You are a friendly and helpful assistant. Answer clearly and concisely, and keep a conversational tone.",
        suggestions: &[
            "Explain how large language models work in two sentences.",
            "Give me three ideas for a weekend trip.",
            "What did I ask you in my first message?",
        ],
        suggestion_description: "Try one of these to start, then ask a follow-up to see the history grow.",
    },
    ScenarioConfig {
        id: Scenario::Data,
        title: "Data Analysis",
        description: "The model calls a code interpreter for calculations.",
        long_description: "Ask a question that needs arithmetic. The model decides whether to call the code_interpreter tool, the application runs the expression, and the result is sent back to the model.",
        system_prompt: "You are a data analysis assistant. When a question requires a calculation, call the code_interpreter tool with a single-line arithmetic expression instead of computing the answer yourself. Explain the result briefly.",
        suggestions: &[
            "What is 15% of 2,340?",
            "If I save $250 a month for 3 years, how much will I have?",
            "What is the area of a circle with a radius of 5?",
        ],
        suggestion_description: "These questions need a calculation, so the model should call its tool.",
    },
    ScenarioConfig {
        id: Scenario::Search,
        title: "Web Search",
        description: "The model grounds its answer in a web search.",
        long_description: "Ask about recent events. The model issues a web search and grounds its answer in the sources it finds. Snippets shown for each source are simulated for illustration.",
        system_prompt: "You are a research assistant with access to web search. Use search results to answer questions about current events and cite the sources you relied on.",
        suggestions: &[
            "Who won the last Super Bowl?",
            "What are the trending movies this month?",
            "What's the weather in Tokyo today?",
            "What's new in space exploration?",
        ],
        suggestion_description: "These questions need up-to-date information from the web.",
    },
    ScenarioConfig {
        id: Scenario::Document,
        title: "Document Library (RAG)",
        description: "The model answers from a small document library.",
        long_description: "Ask about the documents in the library. The application retrieves the most relevant sentences with a simulated hybrid search and gives only those excerpts to the model.",
        system_prompt: "You are a helpful assistant for an internal document library. Answer strictly from the document excerpts you are given. If the excerpts do not contain the answer, say that the documents do not cover it.",
        suggestions: &[
            "What is the budget for Project Nova?",
            "Who is the lead engineer?",
            "Where is the company offsite?",
            "When does the marketing campaign start?",
        ],
        suggestion_description: "Ask about projects, people, budgets, and events described in the library.",
    },
];

/// All scenario configurations in display order.
pub fn scenario_configs() -> &'static [ScenarioConfig] {
    &SCENARIOS
}

/// Configuration for one scenario.
pub fn scenario_config(scenario: Scenario) -> &'static ScenarioConfig {
    match scenario {
        Scenario::Normal => &SCENARIOS[0],
        Scenario::Data => &SCENARIOS[1],
        Scenario::Search => &SCENARIOS[2],
        Scenario::Document => &SCENARIOS[3],
    }
}

/// The built-in document library.
pub fn default_documents() -> Vec<Document> {
    vec![
        Document::new(
            "Project Nova: Executive Summary",
            "Project Nova is a next-generation customer analytics platform scheduled to launch in Q2 2024. \
             The project is led by Dr. Evelyn Reed, who serves as the lead engineer and chief architect. \
             David Chen is the project manager responsible for timelines and stakeholder communication. \
             The total approved budget for Project Nova is $4 million, with $1 million reserved for cloud infrastructure. \
             The core team consists of twelve engineers split across data, platform, and frontend squads.",
        ),
        Document::new(
            "Q3 Marketing Campaign Brief",
            "The Q3 marketing campaign will promote the launch of Project Nova to enterprise customers. \
             The campaign kicks off on August 15th with a webinar series hosted by David Chen. \
             A second wave of paid advertising begins on October 3rd and targets mid-market retail companies. \
             The campaign budget is $2 million, split evenly between digital ads and industry events. \
             Success will be measured by qualified leads, webinar attendance, and demo requests.",
        ),
        Document::new(
            "Annual Company Offsite Logistics",
            "This year's company offsite will take place in Lisbon, Portugal. \
             Employees should arrive by September 1st for the opening dinner. \
             The agenda includes strategy sessions, team workshops, and a keynote from Dr. Evelyn Reed on the Nova architecture. \
             Travel and accommodation are covered by the company, with a total event budget of $1 million. \
             Questions about logistics should go to the people operations team.",
        ),
        Document::new(
            "On-Call Rotation Quick Reference",
            "Primary responder: platform squad\n\
             Secondary responder: data squad\n\
             Escalation contact: the lead engineer\n\
             Handover: Monday morning standup",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_document;

    #[test]
    fn test_every_scenario_has_config() {
        for scenario in Scenario::ALL {
            let config = scenario_config(scenario);
            assert_eq!(config.id, scenario);
            assert!(!config.system_prompt.is_empty());
        }
        assert_eq!(scenario_configs().len(), Scenario::ALL.len());
    }

    #[test]
    fn test_catalog_titles_unique() {
        let docs = default_documents();
        let mut titles: Vec<&str> = docs.iter().map(|d| d.title.as_str()).collect();
        titles.sort();
        titles.dedup();
        assert_eq!(titles.len(), docs.len());
    }

    #[test]
    fn test_reference_card_is_single_chunk() {
        let docs = default_documents();
        let chunks = chunk_document(3, &docs[3]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, docs[3].content);
    }
}
