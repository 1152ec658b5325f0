//! Brief text assembly for the generation API.
//!
//! The header lines and every card are joined with [`CARD_SEPARATOR`], the
//! token the generation API splits cards on. Output is fully determined by
//! the headlines, keyword, and date.

use crate::models::Headline;
use crate::normalize::normalize_keyword;
use chrono::{Local, NaiveDate};

pub const CARD_SEPARATOR: &str = "\n---\n";

const LANGUAGE_INSTRUCTION: &str = "请严格使用简体中文输出所有标题与正文，不要使用英文段落。";
const IMAGE_FALLBACK: &str = "无（请改用AI生成）";
const IMAGE_INSTRUCTION: &str =
    "*配图要求*: 为本条新闻生成一幅说明性AI图片（信息图/新闻插画风格），用于解释新闻重点。";

fn render_card(index: usize, item: &Headline) -> String {
    let mut lines = vec![format!("## {}. {}", index + 1, item.title)];
    if !item.published_at.is_empty() {
        lines.push(format!("*时间*: {}", item.published_at));
    }
    lines.push(format!("*来源*: {}", item.source));
    if !item.link.is_empty() {
        lines.push(format!("*链接*: {}", item.link));
    }
    if !item.expanded_facts.is_empty() {
        lines.push("*核心事实*:".to_string());
        for (n, fact) in item.expanded_facts.iter().enumerate() {
            lines.push(format!("{}. {}", n + 1, fact.text));
            for (m, source) in fact.sources.iter().enumerate() {
                lines.push(format!("   [{}] {} {}", m + 1, source.title, source.url));
            }
        }
    }
    lines.push(format!(
        "*配图URL*: {}",
        item.image_url.as_deref().unwrap_or(IMAGE_FALLBACK)
    ));
    lines.push(IMAGE_INSTRUCTION.to_string());
    lines.join("\n")
}

/// Render the brief for `today`.
pub fn build_brief_input_on(items: &[Headline], keyword: &str, today: NaiveDate) -> String {
    let header = [
        LANGUAGE_INSTRUCTION.to_string(),
        format!("# Daily Industry Brief — {}", today.format("%Y-%m-%d")),
        format!("本期主题关键词：{}", normalize_keyword(Some(keyword))),
        String::new(),
    ];
    header
        .into_iter()
        .chain(items.iter().enumerate().map(|(i, item)| render_card(i, item)))
        .collect::<Vec<_>>()
        .join(CARD_SEPARATOR)
}

pub fn build_brief_input(items: &[Headline], keyword: &str) -> String {
    build_brief_input_on(items, keyword, Local::now().date_naive())
}
