use crate::style::{Palette, StyledRun, coalesce_runs};

use super::SearchMatch;

/// Recolor the parts of `runs` covered by matches.
///
/// `base_offset` is the character offset of the first run inside the text
/// the matches were computed on. The current match gets the strong
/// background, the others the secondary one, and every match gets the
/// contrasting foreground.
pub fn apply_highlights(
    runs: &[StyledRun],
    base_offset: usize,
    matches: &[SearchMatch],
    palette: &Palette,
) -> Vec<StyledRun> {
    let mut next = matches.partition_point(|m| m.end() <= base_offset);
    let mut pos = base_offset;
    let mut out = Vec::with_capacity(runs.len());

    for run in runs {
        let mut segment = String::new();
        let mut state: Option<bool> = None;
        for ch in run.text.chars() {
            while next < matches.len() && matches[next].end() <= pos {
                next += 1;
            }
            let here = matches
                .get(next)
                .filter(|m| m.offset <= pos)
                .map(|m| m.is_current);
            if here != state && !segment.is_empty() {
                out.push(highlighted(std::mem::take(&mut segment), run, state, palette));
            }
            state = here;
            segment.push(ch);
            pos += 1;
        }
        if !segment.is_empty() {
            out.push(highlighted(segment, run, state, palette));
        }
    }
    coalesce_runs(out)
}

fn highlighted(text: String, run: &StyledRun, state: Option<bool>, palette: &Palette) -> StyledRun {
    let style = match state {
        None => run.style.clone(),
        Some(is_current) => {
            let bg = if is_current {
                palette.search_current_bg
            } else {
                palette.search_other_bg
            };
            run.style.clone().with_bg(bg).with_fg(palette.search_fg)
        }
    };
    StyledRun::new(text, style)
}
