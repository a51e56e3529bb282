use glam::DVec2;
use image::GrayImage;

/// A located marker before centroid computation, in the coordinates of the
/// image handed to the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMarker {
    /// Decoded payload; empty if the marker was located but not readable.
    pub label: String,
    pub corners: [DVec2; 4],
}

impl DecodedMarker {
    pub fn centroid(&self) -> DVec2 {
        self.corners.iter().copied().sum::<DVec2>() / 4.0
    }
}

/// Finds and decodes fiducial markers in a grayscale image.
pub trait MarkerDecoder {
    fn decode(&self, image: &GrayImage) -> Vec<DecodedMarker>;
}

/// QR code decoder backed by `rqrr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl MarkerDecoder for QrDecoder {
    fn decode(&self, image: &GrayImage) -> Vec<DecodedMarker> {
        let (width, height) = image.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                image.get_pixel(x as u32, y as u32).0[0]
            });

        prepared
            .detect_grids()
            .into_iter()
            .map(|grid| {
                let corners = grid.bounds.map(|p| DVec2::new(p.x as f64, p.y as f64));
                let label = match grid.decode() {
                    Ok((_meta, content)) => content,
                    Err(err) => {
                        tracing::debug!("located QR grid could not be decoded: {}", err);
                        String::new()
                    }
                };
                DecodedMarker { label, corners }
            })
            .collect()
    }
}
