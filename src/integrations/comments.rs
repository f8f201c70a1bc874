//! LLM 评论生成：一条置顶评论 + n 条观众回复

use std::sync::Arc;

use async_trait::async_trait;

use crate::integrations::{ClientError, CommentContext, CommentWriter};
use crate::llm::{CompletionOptions, LlmClient, Message};

const PIN_PROMPT: &str = "You are writing a short, friendly top comment for a YouTube Short.
Keep it under 140 characters.
Goal: invite viewers to reply with a quick action (\"drop your site\", \"ask a question\", etc.)
Tone: concise, helpful, non-spammy.
Context:
Title: {title}
Description: {description}
Tags: {tags}
Return only the comment text, no quotes.";

const REPLY_PROMPT: &str = "You are generating {n} short, natural viewer comments for a YouTube Short.
Each comment must be under 120 characters, varied, and relevant to:
Title: {title}
Description: {description}
Tags: {tags}
Avoid emojis overload, no links, no sales pitches, no repeated phrasing.
Return as a JSON array of strings.";

const PIN_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.7,
    max_tokens: 100,
};

const REPLY_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.8,
    max_tokens: 200,
};

pub struct LlmCommentWriter {
    llm: Arc<dyn LlmClient>,
}

impl LlmCommentWriter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn ask(&self, prompt: String, options: &CompletionOptions) -> Result<String, ClientError> {
        let reply = self
            .llm
            .complete(&[Message::user(prompt)], options)
            .await
            .map_err(ClientError::Llm)?;
        Ok(reply.trim().to_string())
    }
}

/// 单遍替换 {title} {description} {tags} {n}；代入的值中出现的占位符原样保留
fn render(template: &str, ctx: &CommentContext<'_>, count: usize) -> String {
    let tags = ctx.tags.join(", ");
    let count = count.to_string();
    let value = |key: &str| match key {
        "title" => Some(ctx.title),
        "description" => Some(ctx.description),
        "tags" => Some(tags.as_str()),
        "n" => Some(count.as_str()),
        _ => None,
    };

    let mut body = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        body.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail.find('}').and_then(|close| value(&tail[1..close]).map(|v| (close, v))) {
            Some((close, v)) => {
                body.push_str(v);
                rest = &tail[close + 1..];
            }
            None => {
                body.push('{');
                rest = &tail[1..];
            }
        }
    }
    body.push_str(rest);

    match ctx.persona_hint.filter(|p| !p.is_empty()) {
        Some(persona) => format!("{}\n\n{}", persona, body),
        None => body,
    }
}

/// 优先按 JSON 字符串数组解析，失败则逐行解析并去掉列表符号
fn parse_replies(text: &str, count: usize) -> Vec<String> {
    let parsed = match serde_json::from_str::<Vec<String>>(text) {
        Ok(items) => items.into_iter().map(|s| s.trim().to_string()).collect(),
        Err(_) => text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.trim_matches(|c: char| c == ' ' || c == '-' || c == '•').to_string())
            .collect::<Vec<_>>(),
    };
    parsed
        .into_iter()
        .filter(|s| !s.is_empty())
        .take(count)
        .collect()
}

#[async_trait]
impl CommentWriter for LlmCommentWriter {
    async fn pinned_comment(&self, ctx: &CommentContext<'_>) -> Result<String, ClientError> {
        let text = self.ask(render(PIN_PROMPT, ctx, 1), &PIN_OPTIONS).await?;
        let text = text.trim_matches('"').trim().to_string();
        if text.is_empty() {
            return Err(ClientError::Llm("empty pinned comment".to_string()));
        }
        Ok(text)
    }

    async fn reply_comments(
        &self,
        ctx: &CommentContext<'_>,
        count: usize,
    ) -> Result<Vec<String>, ClientError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let prompt = render(REPLY_PROMPT, ctx, count);
        let text = self.ask(prompt, &REPLY_OPTIONS).await?;
        Ok(parse_replies(&text, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn ctx<'a>(tags: &'a [String], persona: Option<&'a str>) -> CommentContext<'a> {
        CommentContext {
            title: "Dealer Tips: Rank higher",
            description: "Daily automotive SEO",
            tags,
            persona_hint: persona,
        }
    }

    #[test]
    fn test_parse_replies_json_and_fallback() {
        assert_eq!(
            parse_replies(r#"[" one ", "two", "three"]"#, 2),
            vec!["one".to_string(), "two".to_string()]
        );
        assert_eq!(
            parse_replies("- first\n\n• second\n- third", 5),
            vec!["first".to_string(), "second".to_string(), "third".to_string()]
        );
    }

    #[tokio::test]
    async fn test_persona_prefixed_and_tags_joined() {
        let mock = Arc::new(MockLlmClient::with_responses(["\"Drop your site below!\""]));
        let writer = LlmCommentWriter::new(mock.clone());
        let tags = vec!["seo".to_string(), "auto".to_string()];

        let text = writer
            .pinned_comment(&ctx(&tags, Some("Auto SEO Expert")))
            .await
            .unwrap();
        assert_eq!(text, "Drop your site below!");

        let prompt = &mock.calls()[0][0].content;
        assert!(prompt.starts_with("Auto SEO Expert\n\n"));
        assert!(prompt.contains("Tags: seo, auto"));
        assert!(prompt.contains("Title: Dealer Tips: Rank higher"));
    }

    #[test]
    fn test_render_does_not_expand_placeholders_inside_values() {
        let tags = vec!["seo".to_string()];
        let ctx = CommentContext {
            title: "Why {tags} and {description} matter",
            description: "About {n} tips",
            tags: &tags,
            persona_hint: None,
        };
        let prompt = render(REPLY_PROMPT, &ctx, 3);
        assert!(prompt.starts_with("You are generating 3 short"));
        assert!(prompt.contains("Title: Why {tags} and {description} matter\n"));
        assert!(prompt.contains("Description: About {n} tips\n"));
        assert!(prompt.contains("Tags: seo\n"));
    }

    #[tokio::test]
    async fn test_reply_count_respected() {
        let mock = Arc::new(MockLlmClient::with_responses([r#"["a", "b", "c"]"#]));
        let writer = LlmCommentWriter::new(mock.clone());
        let replies = writer.reply_comments(&ctx(&[], None), 2).await.unwrap();
        assert_eq!(replies, vec!["a".to_string(), "b".to_string()]);
        assert!(mock.calls()[0][0].content.starts_with("You are generating 2 short"));
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let writer = LlmCommentWriter::new(Arc::new(MockLlmClient::default()));
        let err = writer.pinned_comment(&ctx(&[], None)).await.unwrap_err();
        assert!(matches!(err, ClientError::Llm(_)));
    }
}
