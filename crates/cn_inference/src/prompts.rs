pub const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a news summarization assistant. Summarize the news article you are given.";

pub fn summary_user_prompt(title: &str, description: &str) -> String {
    format!(
        "Given the following news article title and description in triple quotes, write a clear,\n\
         concise and informative summary of about 60 words. Capture the key facts and main points\n\
         without commentary or unnecessary detail.\n\n\
         Title: '''{}'''\n\
         Description: '''{}'''\n\n\
         Answer with the summary as a single coherent paragraph.",
        title, description
    )
}

pub const INTENT_SYSTEM_PROMPT: &str = r#"You analyze user queries for a news application.

Your task:
1. Identify the primary intent of the query. It must be one of: "category", "source", "nearby", "score", "search".
2. Extract the entities most relevant to that intent.
3. Produce keywords for searching article titles and descriptions.

Rules:
- Use "category", "source", "nearby" or "score" only when the query clearly asks for it; otherwise use "search".
- Answer with a single minified JSON object and nothing else.
- "intent": one of ["category", "source", "nearby", "score", "search"]
- "entities": array of strings, empty when none are found
- "keywords": array of lowercase, deduplicated terms with stopwords removed"#;

pub fn intent_user_prompt(query: &str) -> String {
    format!(
        r#"Analyze the following news query and answer in the required JSON structure.

Query: '''"{}"'''

Answer format:
{{"intent":"intent","entities":["entity1","entity2"],"keywords":["keyword1","keyword2"]}}

Examples:

1. Query: "Latest developments in the Elon Musk Twitter acquisition"
   Answer: {{"intent":"search","entities":["Elon Musk","Twitter acquisition"],"keywords":["elon musk","twitter acquisition","latest developments"]}}

2. Query: "Show me technology news from Reuters"
   Answer: {{"intent":"source","entities":["Reuters"],"keywords":["technology","news","reuters"]}}

3. Query: "What's happening in sports?"
   Answer: {{"intent":"category","entities":["sports"],"keywords":["sports","happening"]}}

4. Query: "Find news near Palo Alto"
   Answer: {{"intent":"nearby","entities":["Palo Alto"],"keywords":["palo alto","news","near"]}}"#,
        query
    )
}

/// Recovers the query embedded by [`intent_user_prompt`].
pub fn embedded_query(user_prompt: &str) -> Option<&str> {
    let start = user_prompt.find("Query: '''\"")? + "Query: '''\"".len();
    let end = user_prompt[start..].find("\"'''")? + start;
    Some(&user_prompt[start..end])
}

/// Recovers the description embedded by [`summary_user_prompt`].
pub fn embedded_description(user_prompt: &str) -> Option<&str> {
    let start = user_prompt.find("Description: '''")? + "Description: '''".len();
    let end = user_prompt[start..].find("'''")? + start;
    Some(&user_prompt[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_values() {
        let prompt = intent_user_prompt("Find news near Palo Alto");
        assert_eq!(embedded_query(&prompt), Some("Find news near Palo Alto"));

        let prompt = summary_user_prompt("Title", "Some description");
        assert_eq!(embedded_description(&prompt), Some("Some description"));
        assert_eq!(embedded_query("no query here"), None);
    }
}
