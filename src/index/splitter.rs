/// Split text into chunks of at most `chunk_size` characters, with
/// `overlap` characters carried between consecutive chunks.
///
/// Cuts prefer the last whitespace inside the window so words stay
/// intact; a window with no whitespace is cut mid-word. Empty or
/// whitespace-only input yields no chunks. Callers validate
/// `overlap < chunk_size` at config load.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let window_end = (start + chunk_size).min(chars.len());

        let mut cut = window_end;
        if window_end < chars.len() {
            if let Some(ws) = chars[start..window_end]
                .iter()
                .rposition(|c| c.is_whitespace())
            {
                if ws > 0 {
                    cut = start + ws;
                }
            }
        }

        let chunk: String = chars[start..cut].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if cut >= chars.len() {
            break;
        }
        // Step forward by at least one character so the walk terminates.
        start = cut.saturating_sub(overlap).max(start + 1);
    }

    chunks
}
