use crate::model::reservation::Reservation;
use chrono::{DateTime, Datelike, Local, Weekday};

pub fn weekday_kanji(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}

/// "1月10日 (金)" 形式の日付表示
pub fn date_disp(dt: DateTime<Local>) -> String {
    format!(
        "{}月{}日 ({})",
        dt.month(),
        dt.day(),
        weekday_kanji(dt.weekday())
    )
}

/// "14:00 - 16:00" 形式の時間帯表示
pub fn time_disp(start: DateTime<Local>, end: DateTime<Local>) -> String {
    format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
}

/// 予約表（共有ビュー）の表データ
pub fn board_rows(reservations: &[Reservation]) -> Vec<Vec<String>> {
    let mut rows = vec![header_with_date()];
    for r in reservations {
        rows.push(row_with_date(r));
    }
    rows
}

/// 週間ダイジェストも予約表と同じ列構成
pub fn weekly_rows(reservations: &[Reservation]) -> Vec<Vec<String>> {
    board_rows(reservations)
}

/// 当日ダイジェストは日付列を省いた 3 列
pub fn daily_rows(reservations: &[Reservation]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "団体名".to_string(),
        "部屋".to_string(),
        "時間".to_string(),
    ]];
    for r in reservations {
        let start = r.start_at.with_timezone(&Local);
        let end = r.end_at.with_timezone(&Local);
        rows.push(vec![
            r.organization.clone(),
            r.room.clone(),
            time_disp(start, end),
        ]);
    }
    rows
}

/// 操作ログに載せる 2 行（ヘッダ + 対象予約）の表データ
pub fn audit_rows(reservation: &Reservation) -> Vec<Vec<String>> {
    vec![header_with_date(), row_with_date(reservation)]
}

/// 編集・削除の選択肢に出すラベル。長すぎる場合は切り詰める。
pub fn selection_label(reservation: &Reservation) -> String {
    let start = reservation.start_at.with_timezone(&Local);
    let label = format!(
        "{} ({}) : {}",
        reservation.organization,
        reservation.room,
        start.format("%m/%d %H:%M")
    );
    if label.chars().count() > 80 {
        let truncated: String = label.chars().take(77).collect();
        format!("{truncated}...")
    } else {
        label
    }
}

fn header_with_date() -> Vec<String> {
    vec![
        "団体名".to_string(),
        "日付 (曜日)".to_string(),
        "部屋".to_string(),
        "時間".to_string(),
    ]
}

fn row_with_date(r: &Reservation) -> Vec<String> {
    let start = r.start_at.with_timezone(&Local);
    let end = r.end_at.with_timezone(&Local);
    vec![
        r.organization.clone(),
        date_disp(start),
        r.room.clone(),
        time_disp(start, end),
    ]
}
