use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::{ArrayView2, Axis};

use crate::error::{MapperError, MapperResult};
use crate::orientation::quat_to_euler;
use crate::volume_element::FieldData;

/// 表头列名，与导入步骤的 Wizard_DataHeaders 一致
pub const ORIENTATION_COLUMNS: [&str; 4] = ["Phase", "Euler1", "Euler2", "Euler3"];

/// 列分隔符
pub const DELIMITER: &str = ", ";

/// 写出逐体素 (Phase, Euler1, Euler2, Euler3) 表
/// 欧拉角保留 17 位小数，避免经 ASCII 导入时损失精度
pub fn render_orientation_table<W: Write>(
    writer: &mut W,
    phase: &[i32],
    eulers: ArrayView2<'_, f64>,
) -> MapperResult<()> {
    if eulers.ncols() != 3 || eulers.nrows() != phase.len() {
        return Err(MapperError::ShapeMismatch(format!(
            "相标签 {} 个，欧拉角形状 {:?}",
            phase.len(),
            eulers.shape()
        )));
    }

    writeln!(writer, "{}", ORIENTATION_COLUMNS.join(DELIMITER))?;
    for (phase, euler) in phase.iter().zip(eulers.axis_iter(Axis(0))) {
        writeln!(
            writer,
            "{}{d}{:20.17}{d}{:20.17}{d}{:20.17}",
            phase,
            euler[0],
            euler[1],
            euler[2],
            d = DELIMITER
        )?;
    }
    Ok(())
}

pub fn write_orientation_table(
    path: &Path,
    phase: &[i32],
    eulers: ArrayView2<'_, f64>,
) -> MapperResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    render_orientation_table(&mut writer, phase, eulers)?;
    writer.flush()?;
    log::info!(
        "已写入取向表: {} ({} 行数据)",
        path.display(),
        phase.len()
    );
    Ok(())
}

/// 从场数据中取指定增量步的四元数，转为欧拉角后写出取向表
pub fn write_field_orientations(
    path: &Path,
    field_data: &FieldData,
    increment: isize,
) -> MapperResult<()> {
    let quaternions = field_data.flat_quaternions(increment)?;
    let phase = field_data.flat_phase();
    if quaternions.nrows() != phase.len() {
        return Err(MapperError::ShapeMismatch(format!(
            "相标签 {} 个，四元数 {} 个",
            phase.len(),
            quaternions.nrows()
        )));
    }
    // 先完成全部转换，失败时不留下半截文件
    let eulers = quat_to_euler(quaternions.view())?;
    write_orientation_table(path, &phase, eulers.view())
}
