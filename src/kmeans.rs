// src/kmeans.rs

use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_stats::QuantileExt;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

use crate::config::KMeansConfig;
use crate::device::{ArrayModule, Device};
use crate::elementwise::{ElementwiseKernel, RawBuffer};

#[derive(Debug, PartialEq)]
pub enum KMeansError {
    EmptyInput,
    InvalidClusterCount(String),
    Shape(String),
    Numeric(String),
}

impl std::fmt::Display for KMeansError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KMeansError::EmptyInput => write!(f, "Input data has no samples or no features"),
            KMeansError::InvalidClusterCount(s) => write!(f, "Invalid cluster count: {}", s),
            KMeansError::Shape(s) => write!(f, "Shape mismatch: {}", s),
            KMeansError::Numeric(s) => write!(f, "Numeric error: {}", s),
        }
    }
}

impl std::error::Error for KMeansError {}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub centers: Array2<f32>, // [n_clusters, dim]
    pub labels: Array1<i32>,  // [n_samples]
    pub iterations: usize,
}

/// Lloyd's algorithm over the rows of a 2-D array.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    pub module: ArrayModule,
    pub seed: Option<u64>,
}

impl KMeans {
    pub fn new(n_clusters: usize, max_iter: usize) -> Self {
        Self {
            n_clusters,
            max_iter,
            module: ArrayModule::Dense,
            seed: None,
        }
    }

    pub fn from_config(config: &KMeansConfig, device: Device) -> Self {
        Self {
            n_clusters: config.n_clusters,
            max_iter: config.max_iter,
            module: ArrayModule::for_device(device, config.elementwise),
            seed: config.seed,
        }
    }

    pub fn with_module(mut self, module: ArrayModule) -> Self {
        self.module = module;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Clusters `x` starting from `n_clusters` distinct rows picked at random.
    pub fn fit(&self, x: ArrayView2<f32>) -> Result<KMeansResult, KMeansError> {
        self.validate(x)?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let initial_indexes = sample(&mut rng, x.nrows(), self.n_clusters).into_vec();
        log::debug!("initial center rows: {:?}", initial_indexes);
        let centers = x.select(Axis(0), &initial_indexes);
        self.fit_from(x, centers)
    }

    /// Clusters `x` starting from the given centers.
    pub fn fit_from(&self, x: ArrayView2<f32>, initial_centers: Array2<f32>) -> Result<KMeansResult, KMeansError> {
        self.validate(x)?;
        if initial_centers.dim() != (self.n_clusters, x.ncols()) {
            return Err(KMeansError::Shape(format!(
                "initial centers have shape {:?}, expected ({}, {})",
                initial_centers.dim(),
                self.n_clusters,
                x.ncols()
            )));
        }

        let mut centers = initial_centers;
        let mut pred = Array1::<i32>::zeros(x.nrows());
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;
            let distances = match self.module {
                ArrayModule::Dense => dense_distances(x, &centers),
                ArrayModule::Elementwise => kernel_distances(x, &centers)?,
            };

            let new_pred = argmin_rows(&distances)?;
            if new_pred == pred {
                break;
            }
            pred = new_pred;

            centers = match self.module {
                ArrayModule::Dense => dense_centers(x, &pred, &centers),
                ArrayModule::Elementwise => kernel_centers(x, &pred, &centers),
            };
            log::trace!("iteration {}: centers {:?}", iterations, centers);
        }

        log::debug!(
            "k-means ({:?}) finished after {} iterations",
            self.module,
            iterations
        );
        Ok(KMeansResult {
            centers,
            labels: pred,
            iterations,
        })
    }

    fn validate(&self, x: ArrayView2<f32>) -> Result<(), KMeansError> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(KMeansError::EmptyInput);
        }
        if self.n_clusters == 0 {
            return Err(KMeansError::InvalidClusterCount(
                "n_clusters must be at least 1".to_string(),
            ));
        }
        if self.n_clusters > x.nrows() {
            return Err(KMeansError::InvalidClusterCount(format!(
                "n_clusters {} exceeds the number of samples {}",
                self.n_clusters,
                x.nrows()
            )));
        }
        Ok(())
    }
}

// Euclidean norm of x[:, None, :] - centers[None, :, :] over the last axis.
fn dense_distances(x: ArrayView2<f32>, centers: &Array2<f32>) -> Array2<f32> {
    let x3 = x.insert_axis(Axis(1));
    let c3 = centers.view().insert_axis(Axis(0));
    let diff = &x3 - &c3;
    diff.mapv(|v| v * v).sum_axis(Axis(2)).mapv(f32::sqrt)
}

// Squared distances; argmin is unaffected by skipping the square root.
fn kernel_distances(x: ArrayView2<f32>, centers: &Array2<f32>) -> Result<Array2<f32>, KMeansError> {
    let (n, dim) = x.dim();
    let k = centers.nrows();
    let dist = [RawBuffer::zeros(n * k)];
    let kernel = ElementwiseKernel::new("calc_distances", |i, out: &[RawBuffer]| {
        let row = i / dim;
        let col = i % dim;
        let data = x[[row, col]] as f64;
        for c in 0..k {
            let diff = centers[[c, col]] as f64 - data;
            out[0].atomic_add(row * k + c, diff * diff);
        }
    });
    kernel.launch(n * dim, &dist);

    let [dist] = dist;
    let values: Vec<f32> = dist.into_vec().into_iter().map(|v| v as f32).collect();
    Array2::from_shape_vec((n, k), values).map_err(|e| KMeansError::Shape(e.to_string()))
}

fn argmin_rows(distances: &Array2<f32>) -> Result<Array1<i32>, KMeansError> {
    distances
        .outer_iter()
        .map(|row| {
            row.argmin()
                .map(|idx| idx as i32)
                .map_err(|e| KMeansError::Numeric(format!("argmin failed: {}", e)))
        })
        .collect::<Result<Vec<i32>, KMeansError>>()
        .map(Array1::from)
}

// Mean of the members of each cluster; an empty cluster keeps its center.
fn dense_centers(x: ArrayView2<f32>, pred: &Array1<i32>, previous: &Array2<f32>) -> Array2<f32> {
    let mut centers = previous.clone();
    for (c, mut center) in centers.outer_iter_mut().enumerate() {
        let members: Vec<usize> = pred
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label as usize == c)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            log::warn!("cluster {} has no members, keeping its previous center", c);
            continue;
        }
        if let Some(mean) = x.select(Axis(0), &members).mean_axis(Axis(0)) {
            center.assign(&mean);
        }
    }
    centers
}

fn kernel_centers(x: ArrayView2<f32>, pred: &Array1<i32>, previous: &Array2<f32>) -> Array2<f32> {
    let (n, dim) = x.dim();
    let k = previous.nrows();
    let outputs = [RawBuffer::zeros(k * dim), RawBuffer::zeros(k)];
    let kernel = ElementwiseKernel::new("calc_center", |i, out: &[RawBuffer]| {
        let row = i / dim;
        let col = i % dim;
        let label = pred[row] as usize;
        out[0].atomic_add(label * dim + col, x[[row, col]] as f64);
        out[1].atomic_add(label, 1.0);
    });
    kernel.launch(n * dim, &outputs);

    let [sums, group] = outputs;
    let sums = sums.into_vec();
    // Each member was counted once per feature.
    let group: Vec<f64> = group.into_vec().into_iter().map(|g| g / dim as f64).collect();

    let mut centers = previous.clone();
    for c in 0..k {
        if group[c] == 0.0 {
            log::warn!("cluster {} has no members, keeping its previous center", c);
            continue;
        }
        for d in 0..dim {
            centers[[c, d]] = (sums[c * dim + d] / group[c]) as f32;
        }
    }
    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use rand::Rng;

    fn two_blobs(per_blob: usize, seed: u64) -> Array2<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = Vec::with_capacity(per_blob * 4);
        for offset in [5.0f32, -5.0] {
            for _ in 0..per_blob {
                data.push(offset + rng.gen_range(-0.5..0.5));
                data.push(offset + rng.gen_range(-0.5..0.5));
            }
        }
        Array::from_shape_vec((per_blob * 2, 2), data).expect("blob shape")
    }

    #[test]
    fn test_dense_distances_match_euclidean() {
        let x = array![[0.0f32, 0.0], [3.0, 4.0]];
        let centers = array![[0.0f32, 0.0], [3.0, 0.0]];
        let d = dense_distances(x.view(), &centers);
        assert_eq!(d.dim(), (2, 2));
        assert_abs_diff_eq!(d[[0, 0]], 0.0);
        assert_abs_diff_eq!(d[[0, 1]], 3.0);
        assert_abs_diff_eq!(d[[1, 0]], 5.0);
        assert_abs_diff_eq!(d[[1, 1]], 4.0);
    }

    #[test]
    fn test_kernel_distances_are_squared() {
        let x = array![[0.0f32, 0.0], [3.0, 4.0]];
        let centers = array![[0.0f32, 0.0], [3.0, 0.0]];
        let d = kernel_distances(x.view(), &centers).expect("kernel distances");
        assert_abs_diff_eq!(d[[0, 1]], 9.0);
        assert_abs_diff_eq!(d[[1, 0]], 25.0);
        assert_abs_diff_eq!(d[[1, 1]], 16.0);
    }

    #[test]
    fn test_fit_separates_two_blobs() -> Result<(), KMeansError> {
        let x = two_blobs(100, 1);
        let result = KMeans::new(2, 20).with_seed(3).fit(x.view())?;

        let first = result.labels[0];
        assert!(result.labels.slice(ndarray::s![..100]).iter().all(|&l| l == first));
        assert!(result.labels.slice(ndarray::s![100..]).iter().all(|&l| l != first));

        let mut xs: Vec<f32> = result.centers.column(0).to_vec();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_abs_diff_eq!(xs[0], -5.0, epsilon = 0.2);
        assert_abs_diff_eq!(xs[1], 5.0, epsilon = 0.2);
        Ok(())
    }

    #[test]
    fn test_dense_and_elementwise_agree() -> Result<(), KMeansError> {
        let x = two_blobs(50, 9);
        let init = x.select(Axis(0), &[0, 1, 60]);
        let dense = KMeans::new(3, 20).fit_from(x.view(), init.clone())?;
        let kernel = KMeans::new(3, 20)
            .with_module(ArrayModule::Elementwise)
            .fit_from(x.view(), init)?;

        assert_eq!(dense.labels, kernel.labels);
        assert_eq!(dense.iterations, kernel.iterations);
        for (a, b) in dense.centers.iter().zip(kernel.centers.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
        }
        Ok(())
    }

    #[test]
    fn test_stops_when_labels_stable() -> Result<(), KMeansError> {
        let x = array![[0.0f32], [0.1], [10.0], [10.1]];
        let init = array![[0.0f32], [10.0]];
        let result = KMeans::new(2, 50).fit_from(x.view(), init)?;
        // First pass labels [0,0,1,1] differ from the zeroed start, second pass confirms.
        assert_eq!(result.iterations, 2);
        assert_eq!(result.labels, array![0, 0, 1, 1]);
        assert_abs_diff_eq!(result.centers[[0, 0]], 0.05, epsilon = 1e-6);
        assert_abs_diff_eq!(result.centers[[1, 0]], 10.05, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_empty_cluster_keeps_previous_center() -> Result<(), KMeansError> {
        let x = array![[0.0f32], [1.0], [2.0]];
        // Every point lands in cluster 1, so cluster 0 is left empty.
        let init = array![[100.0f32], [1.0]];
        for module in [ArrayModule::Dense, ArrayModule::Elementwise] {
            let result = KMeans::new(2, 1).with_module(module).fit_from(x.view(), init.clone())?;
            assert_eq!(result.labels, array![1, 1, 1]);
            assert_abs_diff_eq!(result.centers[[0, 0]], 100.0);
            assert_abs_diff_eq!(result.centers[[1, 0]], 1.0, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_seeded_fit_is_reproducible() -> Result<(), KMeansError> {
        let x = two_blobs(30, 4);
        let a = KMeans::new(2, 10).with_seed(11).fit(x.view())?;
        let b = KMeans::new(2, 10).with_seed(11).fit(x.view())?;
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centers, b.centers);
        Ok(())
    }

    #[test]
    fn test_invalid_inputs() {
        let empty = Array2::<f32>::zeros((0, 2));
        assert_eq!(KMeans::new(2, 10).fit(empty.view()).unwrap_err(), KMeansError::EmptyInput);

        let x = array![[0.0f32, 1.0]];
        assert!(matches!(
            KMeans::new(2, 10).fit(x.view()),
            Err(KMeansError::InvalidClusterCount(_))
        ));
        assert!(matches!(
            KMeans::new(0, 10).fit(x.view()),
            Err(KMeansError::InvalidClusterCount(_))
        ));
        assert!(matches!(
            KMeans::new(1, 10).fit_from(x.view(), array![[0.0f32]]),
            Err(KMeansError::Shape(_))
        ));
    }

    #[test]
    fn test_nan_input_reports_numeric_error() {
        let x = array![[f32::NAN], [1.0]];
        let err = KMeans::new(2, 5).fit_from(x.view(), array![[f32::NAN], [1.0]]).unwrap_err();
        assert!(matches!(err, KMeansError::Numeric(_)));
    }

    #[test]
    fn test_from_config_picks_module_by_device() {
        let config = KMeansConfig {
            elementwise: true,
            ..KMeansConfig::default()
        };
        assert_eq!(KMeans::from_config(&config, Device::Cpu).module, ArrayModule::Dense);
        assert_eq!(
            KMeans::from_config(&config, Device::Cuda(0)).module,
            ArrayModule::Elementwise
        );
    }
}
