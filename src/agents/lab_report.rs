use super::prompts::{LAB_REPORT_NO_CONTEXT, LAB_REPORT_PROMPT, LAB_REPORT_QUERY};
use super::AgentError;
use crate::knowledge::MedicalRetriever;
use crate::llm::{ChatMessage, LlmClient};

pub const EMPTY_REPORT_MESSAGE: &str = "Could not extract text from the PDF. The file may be empty, corrupted, or image-based (scanned document).";

/// Chunks retrieved as background for every report.
pub const LAB_REPORT_TOP_K: usize = 3;

pub fn lab_report_request(report_text: &str, medical_context: &str) -> String {
    format!(
        "Please analyze this laboratory report and provide helpful advice.\n\n\
         LABORATORY REPORT TEXT:\n{report_text}\n\n\
         MEDICAL KNOWLEDGE BASE INFORMATION:\n{medical_context}\n\n\
         Please provide a clear analysis identifying any abnormal values and giving advice for the patient."
    )
}

/// Explain a lab report in plain language, grounded on the knowledge base when available.
pub fn analyze_lab_report(
    llm: &dyn LlmClient,
    model: &str,
    retriever: Option<&dyn MedicalRetriever>,
    report_text: &str,
) -> Result<String, AgentError> {
    if report_text.trim().is_empty() {
        return Ok(EMPTY_REPORT_MESSAGE.to_string());
    }

    let context = retriever
        .and_then(|r| match r.search(LAB_REPORT_QUERY, LAB_REPORT_TOP_K) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Lab report retrieval failed: {e}");
                None
            }
        })
        .unwrap_or_else(|| LAB_REPORT_NO_CONTEXT.to_string());

    let messages = [
        ChatMessage::system(LAB_REPORT_PROMPT),
        ChatMessage::user(lab_report_request(report_text, &context)),
    ];
    Ok(llm.chat(model, &messages, &[])?.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeError;
    use crate::llm::MockLlmClient;

    struct Kb;

    impl MedicalRetriever for Kb {
        fn search(&self, query: &str, top_k: usize) -> Result<Option<String>, KnowledgeError> {
            assert_eq!(query, LAB_REPORT_QUERY);
            assert_eq!(top_k, LAB_REPORT_TOP_K);
            Ok(Some("Hemoglobin reference ranges".into()))
        }
    }

    #[test]
    fn blank_text_is_not_sent_to_model() {
        let llm = MockLlmClient::new("unused");
        let out = analyze_lab_report(&llm, "m", None, " \n ").unwrap();
        assert_eq!(out, EMPTY_REPORT_MESSAGE);
        assert!(llm.requests().is_empty());
    }

    #[test]
    fn request_includes_report_and_context() {
        let llm = MockLlmClient::new("Lab Report Analysis\n\nResults explained: normal");
        let out = analyze_lab_report(&llm, "m", Some(&Kb), "HGB 17.9 g/dL (13.5-17.5)").unwrap();
        assert!(out.starts_with("Lab Report Analysis"));
        let request = &llm.requests()[0][1].content;
        assert!(request.contains("HGB 17.9 g/dL"));
        assert!(request.contains("Hemoglobin reference ranges"));
    }

    #[test]
    fn missing_knowledge_base_uses_fallback_note() {
        let llm = MockLlmClient::new("ok");
        analyze_lab_report(&llm, "m", None, "WBC 6.1").unwrap();
        assert!(llm.requests()[0][1].content.contains(LAB_REPORT_NO_CONTEXT));
    }
}
