//! Display helpers for search hits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse file type derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    Folder,
    CadPart,
    CadAssembly,
    CadDrawing,
    Step,
    Iges,
    Dwg,
    Dxf,
    Pdf,
    Document,
    Spreadsheet,
    Text,
    Image,
    Other,
}

impl FileKind {
    pub fn classify(name: &str, is_dir: bool) -> Self {
        if is_dir {
            return FileKind::Folder;
        }
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "sldprt" | "prt" | "ipt" => FileKind::CadPart,
            "sldasm" | "asm" | "iam" => FileKind::CadAssembly,
            "slddrw" | "drw" | "idw" => FileKind::CadDrawing,
            "step" | "stp" => FileKind::Step,
            "iges" | "igs" => FileKind::Iges,
            "dwg" => FileKind::Dwg,
            "dxf" => FileKind::Dxf,
            "pdf" => FileKind::Pdf,
            "doc" | "docx" | "rtf" | "odt" => FileKind::Document,
            "xls" | "xlsx" | "xlsm" | "csv" | "ods" => FileKind::Spreadsheet,
            "txt" | "md" | "log" => FileKind::Text,
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "gif" => FileKind::Image,
            _ => FileKind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Folder => "Folder",
            FileKind::CadPart => "CAD Part",
            FileKind::CadAssembly => "CAD Assembly",
            FileKind::CadDrawing => "CAD Drawing",
            FileKind::Step => "STEP",
            FileKind::Iges => "IGES",
            FileKind::Dwg => "DWG",
            FileKind::Dxf => "DXF",
            FileKind::Pdf => "PDF",
            FileKind::Document => "Document",
            FileKind::Spreadsheet => "Spreadsheet",
            FileKind::Text => "Text",
            FileKind::Image => "Image",
            FileKind::Other => "File",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Human-readable size: whole units from 10 up, one decimal below.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 || value >= 10.0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
