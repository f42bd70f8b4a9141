use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use garde::Validate;
use kernel::model::{
    id::{ReservationId, UserId},
    reservation::Reservation,
};
use kernel::service::table::selection_label;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};

/// 予約フォームの入力。日付と時刻は選択メニューと同じ表記
/// （"1/10" と "14:00"）をそのまま受け取る。
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservationFormRequest {
    #[garde(length(min = 1, max = 64))]
    pub organization: String,
    #[garde(skip)]
    pub room: Option<String>,
    /// "M/D" 形式
    #[garde(length(min = 3, max = 5))]
    pub date: String,
    /// "H:MM" 形式
    #[garde(length(min = 4, max = 5))]
    pub start_time: String,
    #[garde(length(min = 4, max = 5))]
    pub end_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub id: ReservationId,
    pub owner_id: UserId,
    pub organization: String,
    pub room: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub notified: bool,
}

impl From<Reservation> for ReservationResponse {
    fn from(value: Reservation) -> Self {
        let Reservation {
            id,
            owner_id,
            organization,
            room,
            start_at,
            end_at,
            created_at,
            notified,
        } = value;
        Self {
            id,
            owner_id,
            organization,
            room,
            start_at,
            end_at,
            created_at,
            notified,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationsResponse {
    pub items: Vec<ReservationResponse>,
}

impl From<Vec<Reservation>> for ReservationsResponse {
    fn from(value: Vec<Reservation>) -> Self {
        Self {
            items: value.into_iter().map(ReservationResponse::from).collect(),
        }
    }
}

/// 変更・取消の選択メニューに出す 1 件分。ラベルは選択肢の表示上限に
/// 合わせて詰めてある。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectableReservationResponse {
    pub id: ReservationId,
    pub label: String,
}

impl From<&Reservation> for SelectableReservationResponse {
    fn from(value: &Reservation) -> Self {
        Self {
            id: value.id,
            label: selection_label(value),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectableReservationsResponse {
    pub items: Vec<SelectableReservationResponse>,
}

impl From<Vec<Reservation>> for SelectableReservationsResponse {
    fn from(value: Vec<Reservation>) -> Self {
        Self {
            items: value.iter().map(SelectableReservationResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationsResponse {
    pub items: Vec<String>,
}

/// 新規作成時は現在の年を、編集時は元予約の開始日の年を使う。
/// 12 月に入った予約を編集しても勝手に翌年へ繰り上がらない。
pub fn year_for_edit(original_start: DateTime<Utc>) -> i32 {
    original_start.with_timezone(&Local).year()
}

/// "M/D" と "H:MM" の組からローカル時刻として解釈した開始・終了を返す。
pub fn parse_schedule(
    year: i32,
    date: &str,
    start_time: &str,
    end_time: &str,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let (month, day) = date
        .trim()
        .split_once('/')
        .ok_or_else(|| invalid_input("日付は MM/DD 形式で入力してください。"))?;
    let month: u32 = month
        .trim()
        .parse()
        .map_err(|_| invalid_input("日付は MM/DD 形式で入力してください。"))?;
    let day: u32 = day
        .trim()
        .parse()
        .map_err(|_| invalid_input("日付は MM/DD 形式で入力してください。"))?;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid_input("存在しない日付です。"))?;
    let start = to_utc(date, start_time)?;
    let end = to_utc(date, end_time)?;
    Ok((start, end))
}

fn to_utc(date: NaiveDate, time: &str) -> AppResult<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| invalid_input("時刻は HH:MM 形式で入力してください。"))?;
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| invalid_input("その時刻は存在しません。"))
}

/// 新規作成の時系列検査。開始が現在時刻ちょうどの申請は受け付ける。
pub fn validate_new_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    ensure_ordered(start, end)?;
    if start < now {
        return Err(invalid_input("過去の日時には予約できません。"));
    }
    Ok(())
}

/// 編集の時系列検査。開始の過去化は設定で許容できる。
pub fn validate_edit_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    allow_past_edit: bool,
) -> AppResult<()> {
    ensure_ordered(start, end)?;
    if !allow_past_edit && start < now {
        return Err(invalid_input("過去の日時には変更できません。"));
    }
    Ok(())
}

fn ensure_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
    if start >= end {
        return Err(invalid_input("開始時刻は終了時刻より前です。"));
    }
    Ok(())
}

fn invalid_input(message: &str) -> AppError {
    AppError::UnprocessableEntity(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_schedule_accepts_menu_style_input() {
        let (start, end) = parse_schedule(2025, "1/10", "14:00", "16:00").unwrap();
        assert!(start < end);
        assert_eq!(
            start.with_timezone(&Local).date_naive(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
        assert_eq!(end - start, chrono::Duration::hours(2));
    }

    #[test]
    fn parse_schedule_rejects_broken_date() {
        assert!(parse_schedule(2025, "110", "14:00", "16:00").is_err());
        assert!(parse_schedule(2025, "1/x", "14:00", "16:00").is_err());
        assert!(parse_schedule(2025, "2/30", "14:00", "16:00").is_err());
    }

    #[test]
    fn parse_schedule_rejects_broken_time() {
        assert!(parse_schedule(2025, "1/10", "25:00", "26:00").is_err());
        assert!(parse_schedule(2025, "1/10", "14時", "16:00").is_err());
    }

    #[test]
    fn new_schedule_rejects_past_but_accepts_exactly_now() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 14, 0, 0).unwrap();
        let hour = chrono::Duration::hours(1);

        assert!(validate_new_schedule(now - hour, now + hour, now).is_err());
        assert!(validate_new_schedule(now, now + hour, now).is_ok());
        assert!(validate_new_schedule(now + hour, now + hour * 2, now).is_ok());
    }

    #[test]
    fn reversed_or_empty_interval_is_rejected() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 14, 0, 0).unwrap();
        let hour = chrono::Duration::hours(1);

        assert!(validate_new_schedule(now + hour, now, now).is_err());
        assert!(validate_new_schedule(now + hour, now + hour, now).is_err());
        assert!(validate_edit_schedule(now + hour, now, now, true).is_err());
    }

    #[test]
    fn edit_into_the_past_follows_the_policy_switch() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 14, 0, 0).unwrap();
        let hour = chrono::Duration::hours(1);

        assert!(validate_edit_schedule(now - hour * 2, now - hour, now, true).is_ok());
        assert!(validate_edit_schedule(now - hour * 2, now - hour, now, false).is_err());
    }

    #[test]
    fn edit_keeps_the_original_year() {
        let original = Local
            .with_ymd_and_hms(2025, 12, 20, 10, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(year_for_edit(original), 2025);
    }
}
