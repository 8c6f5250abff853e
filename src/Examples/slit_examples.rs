use crate::Slit::slit_processing::{
    ConvMode, SlitNorm, convolve_with_slit, crop_slit, get_FWHM, get_effective_FWHM, plot_slit,
    recenter_slit,
};
use crate::Slit::slit_shapes::{SlitEnum, SlitGenerator, SlitType, create_slit};

pub fn slit_examples(task: usize) {
    match task {
        0 => {
            // Generate the three kernel shapes for a 1.4 nm FWHM and compare
            // their geometric and effective widths.
            for kind in [SlitType::Triangular, SlitType::Gaussian, SlitType::Trapezoidal] {
                let slit: SlitEnum = create_slit(kind, 1.4);
                let (w_slit, i_slit) = slit.generate(0.01, 0.0).unwrap();
                plot_slit(&w_slit, &i_slit, &format!("{:?} 1.4 nm", kind)).unwrap();
                println!(
                    "{:?}: FWHM {:.3} nm, effective FWHM {:.3} nm",
                    kind,
                    get_FWHM(&w_slit, &i_slit).unwrap(),
                    get_effective_FWHM(&w_slit, &i_slit).unwrap()
                );
            }
        }
        1 => {
            // Broaden a delta-like line and read the slit width back off the
            // broadened spectrum.
            let wstep = 0.01;
            let w: Vec<f64> = (0..=2000).map(|i| 4170.0 + wstep * i as f64).collect();
            let mut intensity = vec![0.0; w.len()];
            intensity[1000] = 1.0;

            let slit = create_slit(SlitType::Gaussian, 1.4);
            let (w_slit, i_slit) = slit.generate(wstep, 0.0).unwrap();
            let (w_conv, i_conv) = convolve_with_slit(
                &w,
                &intensity,
                &w_slit,
                &i_slit,
                SlitNorm::Area,
                ConvMode::Valid,
            )
            .unwrap();
            println!(
                "delta line broadened to FWHM {:.3} nm (slit was {:.3} nm)",
                get_FWHM(&w_conv, &i_conv).unwrap(),
                slit.fwhm()
            );
        }
        2 => {
            // Clean up a "measured" kernel: recenter the centroid on zero and
            // crop the noisy wings below 1% of the peak.
            let slit = create_slit(SlitType::Gaussian, 1.0);
            let (w_raw, i_raw) = slit.generate(0.01, 633.2).unwrap();
            let w_centered = recenter_slit(&w_raw, &i_raw, 0.0).unwrap();
            let (w_cut, i_cut) = crop_slit(&w_centered, &i_raw, 0.01).unwrap();
            println!(
                "kernel recentered from 633.2 to 0 and cropped {} -> {} points",
                w_raw.len(),
                w_cut.len()
            );
            plot_slit(&w_cut, &i_cut, "cleaned measured slit").unwrap();
        }
        _ => println!("no such slit example: {}", task),
    }
}
