pub fn report_system_prompt() -> &'static str {
    "You are a medical assistant generating structured reports."
}

pub fn chat_system_prompt() -> &'static str {
    "You are a medical assistant answering questions about a doctor-patient consultation."
}

pub fn report_prompt(context: &str) -> String {
    format!(
        r#"Based on the following doctor-patient conversation, generate:
- A clear diagnosis summary
- A list of medications prescribed

Label the sections "Diagnosis" and "Medications".

Conversation:
{context}
"#
    )
}

pub fn chat_prompt(context: &str, question: &str) -> String {
    format!(
        r#"Use the following excerpts from a doctor-patient conversation to answer the question at the end. If the excerpts do not contain the answer, say that you don't know; do not make one up.

{context}

Question: {question}
"#
    )
}
