//! Prompt assembly for both readings.
//!
//! Rendering is pure: the same request always produces the same system instruction and user
//! message. Cards are labelled by draw order against [`POSITION_LABELS`].
use std::fmt;

use crate::generator::{GenerationRequest, Message, Role};
use crate::models::{Card, DetailedRequest, ReadingRequest, SPREAD_SIZE};
use crate::settings::GenerationProfile;

pub const POSITION_LABELS: [&str; SPREAD_SIZE] = [
    "往昔之影 (過去/背景)",
    "當下之核 (現在/核心)",
    "未來之徑 (未來/結果)",
];

pub const CONCISE_SYSTEM_PROMPT: &str = "你是一位洞悉星辰密語的塔羅占卜師。請連結宇宙的智慧，根據使用者抽出的三張牌陣，針對其問題，給予一段**簡潔明瞭、一針見血的核心解讀**。點出最關鍵的影響、狀態和可能性即可。";

pub const DETAILED_SYSTEM_PROMPT: &str = "你是一位富有洞察力和同理心的顧問。請基於以下提供的塔羅牌陣資訊和初步解讀，提供一個更深入、更詳盡、更具體的分析和建議。\n請包含：\n1.牌意關聯與故事線。\n2.核心洞見、挑戰或機遇。\n3.具體行動建議或思考方向。\n4.潛在盲點提醒。\n請用豐富、細膩且充滿同理心的語言來表達。";

/// Returned instead of an error when the model produces no text.
pub const CONCISE_FALLBACK: &str = "抱歉，無法生成初步解讀。";
pub const DETAILED_FALLBACK: &str = "抱歉，無法生成詳細建議。";

fn keywords(card: &Card) -> String {
    card.keywords.join(", ")
}

/// Plain-text spread used by the concise reading.
struct PlainSpread<'a>(&'a [Card; SPREAD_SIZE]);

impl fmt::Display for PlainSpread<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (card, position)) in self.0.iter().zip(POSITION_LABELS).enumerate() {
            writeln!(f, "星位 {}: {}", i + 1, position)?;
            writeln!(f, "牌卡: {} ({})", card.name, card.orientation())?;
            writeln!(f, "關鍵詞: {}", keywords(card))?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Markdown bullet spread used by the detailed reading.
struct MarkdownSpread<'a>(&'a [Card; SPREAD_SIZE]);

impl fmt::Display for MarkdownSpread<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (card, position)) in self.0.iter().zip(POSITION_LABELS).enumerate() {
            writeln!(f, "* **星位 {}: {}**", i + 1, position)?;
            writeln!(f, "    * 牌卡: {} ({})", card.name, card.orientation())?;
            writeln!(f, "    * 關鍵詞: {}", keywords(card))?;
        }
        Ok(())
    }
}

pub fn concise_user_prompt(reading: &ReadingRequest) -> String {
    format!(
        "探尋領域：「{}」\n提問：「{}」\n\n星盤位置與神諭牌卡：\n\n{}",
        reading.topic,
        reading.question,
        PlainSpread(&reading.drawn_cards)
    )
}

pub fn detailed_user_prompt(request: &DetailedRequest) -> String {
    let reading = &request.reading;
    format!(
        "## 原始提問背景\n* 探尋領域：「{}」\n* 提問：「{}」\n\n## 抽出的牌陣\n{}\n## 初步簡潔解讀\n```\n{}\n```\n\n## 請提供深入分析與建議",
        reading.topic,
        reading.question,
        MarkdownSpread(&reading.drawn_cards),
        request.concise_interpretation
    )
}

fn single_turn(profile: &GenerationProfile, system: &str, content: String) -> GenerationRequest {
    GenerationRequest {
        model: profile.model.clone(),
        max_tokens: profile.max_tokens,
        system: system.to_owned(),
        messages: vec![Message {
            role: Role::User,
            content,
        }],
    }
}

pub fn concise_request(reading: &ReadingRequest, profile: &GenerationProfile) -> GenerationRequest {
    single_turn(profile, CONCISE_SYSTEM_PROMPT, concise_user_prompt(reading))
}

pub fn detailed_request(request: &DetailedRequest, profile: &GenerationProfile) -> GenerationRequest {
    single_turn(profile, DETAILED_SYSTEM_PROMPT, detailed_user_prompt(request))
}
