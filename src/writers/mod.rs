mod ensemble;
mod orientation_table;

pub use ensemble::{CrystalStructure, EnsembleDescriptor, EnsemblePhase, PhaseType};
pub use orientation_table::{
    DELIMITER, ORIENTATION_COLUMNS, render_orientation_table, write_field_orientations,
    write_orientation_table,
};
