/// Per-axis standardisation (zero mean, unit population variance).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StandardScaler {
    pub mean: [f64; 2],
    pub scale: [f64; 2],
}

impl StandardScaler {
    pub fn fit(points: &[[f64; 2]]) -> Self {
        if points.is_empty() {
            return Self { mean: [0.0; 2], scale: [1.0; 2] };
        }
        let n = points.len() as f64;
        let mut mean = [0.0; 2];
        for p in points {
            mean[0] += p[0];
            mean[1] += p[1];
        }
        mean[0] /= n;
        mean[1] /= n;

        let mut var = [0.0; 2];
        for p in points {
            var[0] += (p[0] - mean[0]).powi(2);
            var[1] += (p[1] - mean[1]).powi(2);
        }
        // constant axis: leave it unscaled
        let scale = var.map(|v| {
            let sd = (v / n).sqrt();
            if sd == 0.0 || !sd.is_finite() { 1.0 } else { sd }
        });
        Self { mean, scale }
    }

    pub fn transform(&self, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
        points
            .iter()
            .map(|p| {
                [
                    (p[0] - self.mean[0]) / self.scale[0],
                    (p[1] - self.mean[1]) / self.scale[1],
                ]
            })
            .collect()
    }

    pub fn inverse_transform(&self, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
        points
            .iter()
            .map(|p| {
                [
                    p[0] * self.scale[0] + self.mean[0],
                    p[1] * self.scale[1] + self.mean[1],
                ]
            })
            .collect()
    }

    pub fn fit_transform(points: &[[f64; 2]]) -> (Self, Vec<[f64; 2]>) {
        let scaler = Self::fit(points);
        let scaled = scaler.transform(points);
        (scaler, scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_axes_have_zero_mean_unit_variance() {
        let pts = [[18.52, 73.85], [19.07, 72.87], [28.61, 77.20], [12.97, 77.59]];
        let (_, scaled) = StandardScaler::fit_transform(&pts);
        for axis in 0..2 {
            let mean: f64 = scaled.iter().map(|p| p[axis]).sum::<f64>() / 4.0;
            let var: f64 = scaled.iter().map(|p| (p[axis] - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_inverse_transform_restores_input() {
        let pts = [[18.52, 73.85], [19.07, 72.87], [28.61, 77.20]];
        let (scaler, scaled) = StandardScaler::fit_transform(&pts);
        let back = scaler.inverse_transform(&scaled);
        for (a, b) in pts.iter().zip(back.iter()) {
            assert!((a[0] - b[0]).abs() < 1e-9);
            assert!((a[1] - b[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_axis_keeps_unit_scale() {
        let pts = [[10.0, 5.0], [10.0, 7.0]];
        let scaler = StandardScaler::fit(&pts);
        assert_eq!(scaler.scale[0], 1.0);
        assert_eq!(scaler.transform(&pts)[0][0], 0.0);
    }
}
