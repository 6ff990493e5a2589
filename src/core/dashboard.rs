use crate::core::{CountDisplay, CountSnapshot, DisplayTarget};

/// Write whichever counters `snapshot` carries. `present` is recomputed
/// locally and written only when both `in` and `out` are known.
pub fn update_counts<D: CountDisplay>(display: &D, snapshot: Option<&CountSnapshot>) {
    let Some(snapshot) = snapshot else {
        return;
    };

    if let Some(count_in) = snapshot.count_in {
        display.write_count(DisplayTarget::InCount, count_in);
    }
    if let Some(count_out) = snapshot.count_out {
        display.write_count(DisplayTarget::OutCount, count_out);
    }
    if let Some(present) = snapshot.present() {
        display.write_count(DisplayTarget::PresentCount, present);
    }
}
