use crate::model::id::{ReservationId, UserId};
use chrono::{DateTime, Utc};

pub mod event;

/// 予約レコード。
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: ReservationId,
    pub owner_id: UserId,
    pub organization: String,
    pub room: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub notified: bool,
}

/// 団体名の固定候補。「その他」を選んだ場合はゲートウェイ側で自由入力になる。
pub const ORGANIZATIONS: &[&str] = &[
    "IT研究会",
    "Gamma",
    "3DP研究会",
    "ボカロ同好会",
    "にゃんぱす",
    "漫研",
    "VRアート会",
];

pub const DEFAULT_ROOM: &str = "大部屋";
