use itertools::Itertools;

use crate::{ExportError, ExportSession};

/// Packages and their pins go out sorted by name; the model's map order is
/// not meaningful here.
pub fn write_packages(s: &mut ExportSession) -> Result<(), ExportError> {
    let dev = s.dev;
    for pkg in dev.packages.iter().sorted_by_key(|p| &p.name) {
        let pkg_row = s.sink.insert_package(&pkg.name)?;
        for pin in pkg.pins.iter().sorted_by_key(|p| &p.name) {
            s.sink
                .insert_package_pin(pkg_row, &pin.name, pin.site.as_deref(), pin.bel.as_deref())?;
        }
        for grade in &pkg.grades {
            s.sink
                .insert_grade(pkg_row, &grade.name, &grade.speed, &grade.temp)?;
        }
    }
    Ok(())
}
