//! Prompt construction and the single model call per answer.
use std::sync::Arc;

use plantcare_core::{Error, GenerationRequest, Result};

use crate::model::GenerationModel;

const ROLE: &str = "You are an expert horticulturist and gardening assistant.";

const SECTIONS: &str = "Format your response in a clear, structured manner with the following sections, in this order:\n\
- Watering: How often and how much to water\n\
- Sunlight: Light requirements and placement\n\
- Soil: Soil type, pH, and potting mix recommendations\n\
- Special Care: Any specific care needs, pruning, fertilizing, etc.\n\
Make your advice practical and actionable for home gardeners.";

pub struct ResponseComposer {
    model: Arc<dyn GenerationModel>,
}

impl ResponseComposer {
    pub fn new(model: Arc<dyn GenerationModel>) -> Self { Self { model } }

    pub fn model_name(&self) -> &str { self.model.name() }

    /// Grounded prompt when the request carries context, the plain
    /// direct-generation prompt otherwise. A question is always appended last.
    pub fn build_prompt(request: &GenerationRequest) -> String {
        let mut prompt = String::from(ROLE);
        if request.context.is_empty() {
            prompt.push_str(&format!(" Provide detailed, practical care tips for a plant of the species: {}. ", request.species));
            prompt.push_str("Include information about watering, sunlight, soil, and special care instructions.\n\n");
        } else {
            prompt.push_str(&format!(" Use the reference information below to provide detailed, practical care tips for a plant of the species: {}.\n\n", request.species));
            prompt.push_str("Reference information:\n");
            for doc in &request.context {
                prompt.push_str(&format!("[{}]\n{}\n\n", doc.species, doc.text));
            }
            prompt.push_str("Base your advice on the reference information where it applies and fill any gaps with general horticultural knowledge.\n\n");
        }
        prompt.push_str(SECTIONS);
        if request.has_question() {
            prompt.push_str(&format!("\n\nAfter these sections, directly answer the user's specific question: \"{}\"", request.question));
        }
        prompt
    }

    pub fn compose(&self, request: &GenerationRequest) -> Result<String> {
        self.compose_with_prompt(&Self::build_prompt(request))
    }

    /// Send `prompt` unchanged; the reply is trimmed and otherwise verbatim.
    pub fn compose_with_prompt(&self, prompt: &str) -> Result<String> {
        match self.model.generate(prompt) {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                tracing::error!(model = self.model.name(), error = %e, "generation model call failed");
                Err(Error::Generation(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantcare_core::CareDocument;

    fn positions(prompt: &str, needles: &[&str]) -> Vec<usize> {
        needles.iter().map(|n| prompt.find(n).unwrap_or_else(|| panic!("missing {n:?} in {prompt}"))).collect()
    }

    #[test]
    fn sections_appear_in_order() {
        let prompt = ResponseComposer::build_prompt(&GenerationRequest::new("Aloe vera", None, vec![]));
        let pos = positions(&prompt, &["- Watering:", "- Sunlight:", "- Soil:", "- Special Care:"]);
        assert!(pos.windows(2).all(|w| w[0] < w[1]));
        assert!(!prompt.contains("Reference information"));
        assert!(prompt.contains("Aloe vera"));
    }

    #[test]
    fn context_is_included_verbatim_before_sections() {
        let ctx = vec![
            CareDocument::new("a:0", "Aloe vera", "Water every three weeks.\nFull sun.", "t", None),
            CareDocument::new("c:0", "Crassula ovata", "Gritty mix.", "t", None),
        ];
        let prompt = ResponseComposer::build_prompt(&GenerationRequest::new("Aloe vera", None, ctx));
        let pos = positions(&prompt, &["expert horticulturist", "Water every three weeks.\nFull sun.", "Gritty mix.", "- Watering:"]);
        assert!(pos.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn question_follows_sections_in_both_branches() {
        let q = "How often should I water in winter?";
        for ctx in [vec![], vec![CareDocument::new("a:0", "Aloe vera", "Dry soil.", "t", None)]] {
            let prompt = ResponseComposer::build_prompt(&GenerationRequest::new("Aloe vera", Some(q), ctx));
            let pos = positions(&prompt, &["- Special Care:", q]);
            assert!(pos[0] < pos[1]);
        }
    }
}
