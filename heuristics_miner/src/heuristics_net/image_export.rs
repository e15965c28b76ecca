use std::{fs::File, io::Write, path::Path};

use graphviz_rust::{cmd::Format, printer::PrinterContext};

use super::{
    export_dot::{export_dot_graph, NetExportError},
    heuristics_net_struct::HeuristicsNet,
};

///
/// Export the image of a [`HeuristicsNet`]
///
/// Also see [`export_heuristics_net_image_svg`] and [`export_heuristics_net_image_png`]
///
pub fn export_heuristics_net_image<P: AsRef<Path>>(
    net: &HeuristicsNet,
    path: P,
    format: Format,
    dpi_factor: Option<f32>,
    split_join: bool,
) -> Result<(), NetExportError> {
    let g = export_dot_graph(net, split_join, dpi_factor);

    let out = graphviz_rust::exec(g, &mut PrinterContext::default(), vec![format.into()])?;

    let mut f = File::create(path)?;
    f.write_all(&out)?;
    Ok(())
}

///
/// Export the image of a [`HeuristicsNet`] as a SVG file
///
pub fn export_heuristics_net_image_svg<P: AsRef<Path>>(
    net: &HeuristicsNet,
    path: P,
    split_join: bool,
) -> Result<(), NetExportError> {
    export_heuristics_net_image(net, path, Format::Svg, None, split_join)
}

///
/// Export the image of a [`HeuristicsNet`] as a PNG file
///
pub fn export_heuristics_net_image_png<P: AsRef<Path>>(
    net: &HeuristicsNet,
    path: P,
    split_join: bool,
) -> Result<(), NetExportError> {
    export_heuristics_net_image(net, path, Format::Png, Some(2.0), split_join)
}

#[cfg(test)]
mod test {
    use crate::{
        heuristics::{config::HeuristicsMinerConfig, miner::HeuristicsMiner},
        import_xes_slice, XESImportOptions,
    };

    use super::{export_heuristics_net_image_png, export_heuristics_net_image_svg};

    fn claims_net() -> crate::heuristics_net::heuristics_net_struct::HeuristicsNet {
        let xes_bytes = include_bytes!("../../test_data/xes/claims_lifecycle.xes");
        let log = import_xes_slice(xes_bytes, false, XESImportOptions::default()).unwrap();
        HeuristicsMiner::from_event_log(&log, HeuristicsMinerConfig::default())
            .mine()
            .net
    }

    #[test]
    pub fn test_heuristics_net_png_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heuristics-net.png");
        export_heuristics_net_image_png(&claims_net(), &path, false).unwrap();
        assert!(path.exists());
    }

    #[test]
    pub fn test_heuristics_net_svg_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heuristics-net.svg");
        export_heuristics_net_image_svg(&claims_net(), &path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
    }
}
