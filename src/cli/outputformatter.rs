use terminal_size::{terminal_size, Height, Width};

use crate::api::{Article, Category};
use crate::feed::{FeedPage, Personalization, PreferenceSet};
use crate::identity::SessionStatus;

// cap to keep a single long title from eating the whole line
const MAX_COL_WIDTH: usize = 80;
const MIN_COL_WIDTH: usize = 4;

/// Render rows as an ASCII table no wider than `max_width`.
/// Columns shrink widest-first until the table fits.
pub fn render_table(cols: &[&str], rows: &[Vec<String>], max_width: usize) -> Vec<String> {
    let mut widths: Vec<usize> = cols.iter().map(|c| display_len(c).min(MAX_COL_WIDTH)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = display_len(cell);
            if w > widths[i] { widths[i] = w.min(MAX_COL_WIDTH); }
        }
    }
    fit_widths(&mut widths, max_width);

    let header: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(sep.clone());
    out.push(build_row(&header, &widths));
    out.push(sep.clone());
    for r in rows {
        out.push(build_row(r, &widths));
    }
    out.push(sep);
    out
}

pub fn render_feed(page: &FeedPage, max_width: usize) -> Vec<String> {
    let mut out = Vec::new();
    if page.is_empty() {
        out.push("no articles".to_string());
    } else {
        let rows: Vec<Vec<String>> = page.articles().iter().map(article_row).collect();
        out.extend(render_table(&["id", "published", "category", "title", "sentiment"], &rows, max_width));
    }
    let mut summary = format!(
        "page {} of {}, {} articles",
        page.current_page, page.total_pages, page.total_count
    );
    match page.personalization {
        Personalization::None => {}
        Personalization::ServerSide => summary.push_str(", personalized"),
        Personalization::ClientSide => summary.push_str(&format!(", personalized locally ({} shown)", page.len())),
    }
    out.push(summary);
    out
}

fn article_row(a: &Article) -> Vec<String> {
    vec![
        a.id.to_string(),
        a.published_at.format("%Y-%m-%d %H:%M").to_string(),
        a.category.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
        a.title.clone(),
        a.sentiment.as_ref().map(|s| format!("{} {:.2}", s.label, s.score)).unwrap_or_default(),
    ]
}

pub fn render_article(a: &Article, max_width: usize) -> Vec<String> {
    let mut out = vec![fit_line_to_width(&a.title, max_width)];
    let mut meta = vec![a.published_at.format("%Y-%m-%d %H:%M UTC").to_string()];
    if let Some(c) = &a.category { meta.push(c.name.clone()); }
    if let Some(au) = &a.author { meta.push(format!("by {}", au.username)); }
    if let Some(src) = &a.source { meta.push(src.clone()); }
    out.push(fit_line_to_width(&meta.join(" | "), max_width));
    if let Some(s) = &a.sentiment {
        out.push(format!("sentiment: {} ({:.2})", s.label, s.score));
    }
    out.push(String::new());
    let body = if a.content.trim().is_empty() { a.summary.clone().unwrap_or_default() } else { a.content.clone() };
    for para in body.lines() {
        out.extend(wrap(para, max_width));
    }
    out
}

pub fn render_categories(cats: &[Category], preferred: Option<&PreferenceSet>, max_width: usize) -> Vec<String> {
    if cats.is_empty() {
        return vec!["no categories".to_string()];
    }
    let rows: Vec<Vec<String>> = cats
        .iter()
        .map(|c| {
            let mark = match preferred {
                Some(p) if p.contains(c.id) => "*".to_string(),
                _ => String::new(),
            };
            vec![c.id.to_string(), c.name.clone(), c.slug.clone(), c.news_count.to_string(), mark]
        })
        .collect();
    render_table(&["id", "name", "slug", "articles", "preferred"], &rows, max_width)
}

pub fn render_status(status: &SessionStatus) -> Vec<String> {
    let mut out = vec![format!("session: {:?}", status.phase).to_lowercase()];
    if let Some(id) = &status.identity {
        out.push(format!("user: {} (id {})", id.username, id.id));
        if let Some(email) = &id.email { out.push(format!("email: {}", email)); }
        let mut roles = Vec::new();
        if status.roles.is_admin { roles.push("admin"); }
        if status.roles.is_superuser { roles.push("superuser"); }
        if !roles.is_empty() { out.push(format!("roles: {}", roles.join(", "))); }
    }
    out
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn fit_widths(widths: &mut [usize], max_width: usize) {
    // each column costs 3 extra chars ("| " + " "), plus the closing '|'
    let overhead = widths.len() * 3 + 1;
    loop {
        let total: usize = widths.iter().sum::<usize>() + overhead;
        if total <= max_width { return; }
        let Some((idx, w)) = widths.iter().copied().enumerate().max_by_key(|(_, w)| *w) else { return };
        if w <= MIN_COL_WIDTH { return; }
        widths[idx] = w.saturating_sub(total - max_width).max(MIN_COL_WIDTH);
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let (text, align_right) = (truncate(&cell, *w), is_numeric_like(&cell));
        let pad = w.saturating_sub(display_len(&text));
        s.push(' ');
        if align_right {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    // crude detection for aligning numbers to right
    let st = s.trim();
    if st.is_empty() { return false; }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-+,_".contains(ch) { continue; }
        return false;
    }
    has_digit
}

fn wrap(text: &str, max_width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && display_len(&line) + 1 + display_len(word) > max_width {
            out.push(std::mem::take(&mut line));
        }
        if !line.is_empty() { line.push(' '); }
        line.push_str(word);
    }
    out.push(line);
    out
}

// --- Terminal fitting ---

pub fn terminal_width() -> usize {
    if let Some((Width(w), Height(_h))) = terminal_size() {
        return (w as usize).saturating_sub(4).max(20);
    }
    80
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if display_len(s) <= maxw { return s.to_string(); }
    truncate(s, maxw)
}
