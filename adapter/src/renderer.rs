use kernel::port::renderer::TableRenderer;
use shared::error::AppResult;

/// 罫線文字で表を組み立てる TableRenderer 実装。
/// 添付ファイルとしてそのまま送れる UTF-8 のバイト列を返す。
pub struct TextTableRenderer;

impl TableRenderer for TextTableRenderer {
    fn render(&self, rows: &[Vec<String>]) -> AppResult<Vec<u8>> {
        Ok(render_table(rows).into_bytes())
    }
}

fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let mut out = String::new();
    out.push_str(&border(&widths, '┌', '┬', '┐'));
    for (i, row) in rows.iter().enumerate() {
        // 先頭行はヘッダとして罫線で区切る
        if i == 1 {
            out.push_str(&border(&widths, '├', '┼', '┤'));
        }
        out.push('│');
        for (j, width) in widths.iter().enumerate() {
            let cell = row.get(j).map(String::as_str).unwrap_or("");
            out.push(' ');
            out.push_str(cell);
            for _ in 0..(width - display_width(cell)) {
                out.push(' ');
            }
            out.push_str(" │");
        }
        out.push('\n');
    }
    out.push_str(&border(&widths, '└', '┴', '┘'));
    out
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let mut line = String::new();
    line.push(left);
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            line.push(mid);
        }
        for _ in 0..(width + 2) {
            line.push('─');
        }
    }
    line.push(right);
    line.push('\n');
    line
}

// ASCII 以外は全角幅とみなす
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}
