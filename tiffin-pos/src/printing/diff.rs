//! Incremental kitchen ticket diff
//!
//! Lines are matched to the last printed snapshot by menu id, never by
//! position, so reordering or removing lines never reprints a dish. Only
//! increases reach the kitchen; a decrease or removal prints nothing.

use shared::order::{OrderLine, OrderSnapshot, Portion, PreviousOrderSnapshot};
use std::collections::{HashMap, HashSet};

/// One line to print on a kitchen ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KotLine {
    pub menu_id: i64,
    pub name: String,
    pub portion: Option<Portion>,
    /// Quantity to cook: the full quantity on a new ticket, the increase on an
    /// additional one
    pub quantity: u32,
    pub instructions: Option<String>,
    /// Nothing was printed for this menu id before
    pub is_new: bool,
}

impl KotLine {
    fn from_line(line: &OrderLine, quantity: u32, is_new: bool) -> Self {
        Self {
            menu_id: line.menu_id,
            name: line.name.clone(),
            portion: line.portion,
            quantity,
            instructions: line.note().map(str::to_string),
            is_new,
        }
    }

    /// `"(Additional N)"` for instructions on an item the kitchen already has
    pub fn annotation(&self) -> Option<String> {
        match (&self.instructions, self.is_new) {
            (Some(_), false) => Some(format!("(Additional {})", self.quantity)),
            _ => None,
        }
    }
}

/// Lines to send to the kitchen
///
/// Without a previous snapshot every line is emitted at full quantity.
/// Otherwise the previously printed quantity of each menu id is consumed by
/// the current lines for that id in order, and only the remainder is emitted.
pub fn kot_lines(
    current: &OrderSnapshot,
    previous: Option<&PreviousOrderSnapshot>,
) -> Vec<KotLine> {
    let Some(previous) = previous else {
        return current
            .items
            .iter()
            .filter(|line| line.quantity > 0)
            .map(|line| KotLine::from_line(line, line.quantity, true))
            .collect();
    };

    let mut printed: HashMap<i64, u32> = HashMap::new();
    for line in previous.items() {
        *printed.entry(line.menu_id).or_default() += line.quantity;
    }
    // A menu id carried at quantity 0 was never cooked
    let cooked: HashSet<i64> = printed
        .iter()
        .filter(|(_, qty)| **qty > 0)
        .map(|(id, _)| *id)
        .collect();

    current
        .items
        .iter()
        .filter_map(|line| {
            let remaining = printed.entry(line.menu_id).or_default();
            let consumed = (*remaining).min(line.quantity);
            *remaining -= consumed;

            let delta = line.quantity - consumed;
            (delta > 0).then(|| KotLine::from_line(line, delta, !cooked.contains(&line.menu_id)))
        })
        .collect()
}

/// Sum of emitted quantities
pub fn total_items(lines: &[KotLine]) -> u32 {
    lines.iter().map(|l| l.quantity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::fixtures::{line, order};

    fn previous(items: Vec<OrderLine>) -> PreviousOrderSnapshot {
        order(items).into()
    }

    #[test]
    fn test_new_order_prints_everything() {
        let current = order(vec![line(1, "Idli", 2), line(2, "Vada", 1)]);

        let lines = kot_lines(&current, None);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 2);
        assert!(lines.iter().all(|l| l.is_new));
        assert_eq!(total_items(&lines), 3);
    }

    #[test]
    fn test_only_increases_are_emitted() {
        let prev = previous(vec![line(1, "Idli", 2), line(2, "Vada", 1)]);
        let current = order(vec![line(1, "Idli", 5), line(2, "Vada", 1), line(3, "Dosa", 1)]);

        let lines = kot_lines(&current, Some(&prev));

        assert_eq!(lines.len(), 2);
        assert_eq!((lines[0].menu_id, lines[0].quantity, lines[0].is_new), (1, 3, false));
        assert_eq!((lines[1].menu_id, lines[1].quantity, lines[1].is_new), (3, 1, true));
        assert_eq!(total_items(&lines), 4);
    }

    #[test]
    fn test_decreases_and_removals_print_nothing() {
        let prev = previous(vec![line(1, "Idli", 4), line(2, "Vada", 2)]);
        let current = order(vec![line(1, "Idli", 1)]);

        assert!(kot_lines(&current, Some(&prev)).is_empty());
    }

    #[test]
    fn test_identical_snapshot_prints_nothing() {
        let items = vec![line(1, "Idli", 2), line(2, "Vada", 1)];
        let prev = previous(items.clone());

        assert!(kot_lines(&order(items), Some(&prev)).is_empty());
    }

    #[test]
    fn test_keyed_by_menu_id_not_position() {
        let prev = previous(vec![line(1, "Idli", 2), line(2, "Vada", 1)]);
        let current = order(vec![line(2, "Vada", 1), line(1, "Idli", 2)]);

        assert!(kot_lines(&current, Some(&prev)).is_empty());
    }

    #[test]
    fn test_duplicate_menu_ids_share_previous_quantity() {
        let prev = previous(vec![line(1, "Idli", 3)]);
        let current = order(vec![line(1, "Idli", 2), line(1, "Idli", 2)]);

        let lines = kot_lines(&current, Some(&prev));

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 1);
        assert_eq!(total_items(&lines), 1);
    }

    #[test]
    fn test_portion_is_not_part_of_identity() {
        let mut half = line(1, "Biryani", 1);
        half.portion = Some(Portion::Half);
        let prev = previous(vec![half.clone()]);

        let mut full = line(1, "Biryani", 2);
        full.portion = Some(Portion::Full);
        let lines = kot_lines(&order(vec![full]), Some(&prev));

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 1);
        assert_eq!(lines[0].portion, Some(Portion::Full));
    }

    #[test]
    fn test_annotation_only_on_existing_items() {
        let prev = previous(vec![line(1, "Idli", 1)]);
        let mut more_idli = line(1, "Idli", 3);
        more_idli.instructions = Some("extra chutney".into());
        let mut dosa = line(2, "Dosa", 1);
        dosa.instructions = Some("crispy".into());
        let mut vada = line(3, "Vada", 1);
        vada.instructions = Some("   ".into());

        let lines = kot_lines(&order(vec![more_idli, dosa, vada]), Some(&prev));

        assert_eq!(lines[0].annotation().as_deref(), Some("(Additional 2)"));
        assert_eq!(lines[1].annotation(), None);
        assert_eq!(lines[2].instructions, None);
        assert_eq!(lines[2].annotation(), None);
    }

    #[test]
    fn test_item_previously_at_zero_counts_as_new() {
        let prev = previous(vec![line(1, "Idli", 0)]);
        let mut idli = line(1, "Idli", 2);
        idli.instructions = Some("soft".into());

        let lines = kot_lines(&order(vec![idli]), Some(&prev));

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert!(lines[0].is_new);
        assert_eq!(lines[0].annotation(), None);
    }

    #[test]
    fn test_zero_quantity_lines_are_skipped() {
        let current = order(vec![line(1, "Idli", 0)]);
        assert!(kot_lines(&current, None).is_empty());
    }
}
