use crate::Spectra::spectrum::Spectrum;
use log::info;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

impl Spectrum {
    /// Write the spectrum to a `.spec` JSON file.
    pub fn store(&self, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(&self)?;
        let mut file = File::create(filename)?;
        file.write_all(json.as_bytes())?;
        info!("spectrum '{}' stored to {}", self.name, filename);
        Ok(())
    }
}

/// Load a spectrum from a `.spec` JSON file, validating that every stored
/// quantity matches the wavespace length.
pub fn load_spec(filename: &str) -> Result<Spectrum, String> {
    let path = Path::new(filename);
    if !path.exists() {
        return Err(format!("File '{}' does not exist", filename));
    }
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => return Err(format!("Failed to open file '{}': {}", filename, e)),
    };
    let mut contents = String::new();
    if let Err(e) = file.read_to_string(&mut contents) {
        return Err(format!("Failed to read file '{}': {}", filename, e));
    }

    let spectrum: Spectrum = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse spectrum file '{}': {}", filename, e))?;

    for (quantity, intensity) in spectrum.quantities.iter() {
        if intensity.len() != spectrum.w.len() {
            return Err(format!(
                "Corrupt spectrum file '{}': quantity '{}' has {} points, wavespace has {}",
                filename,
                quantity,
                intensity.len(),
                spectrum.w.len()
            ));
        }
    }
    info!(
        "loaded spectrum '{}' from {}: {} points, quantities [{}]",
        spectrum.name,
        filename,
        spectrum.w.len(),
        spectrum.quantity_names().join(", ")
    );
    Ok(spectrum)
}
