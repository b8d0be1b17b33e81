/// Builds the single user message sent to the model. Pure: the same chunks
/// and question always give the same bytes.
pub fn build_prompt<S: AsRef<str>>(context_chunks: &[S], question: &str) -> String {
    let context = context_chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "
You are a helpful assistant for enterprise policy questions.
Answer ONLY using the context below.
If the answer is not present, say \"I don't know\".

Context:
{context}

Question:
{question}

Answer:
"
    )
}
