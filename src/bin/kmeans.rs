//! Clusters two Gaussian blobs with the dense path on the host and with the
//! path selected for the accelerator device, timing both.

use clap::Parser;
use ndarray::{concatenate, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::error::Error;

use arraykit::common::Timer;
use arraykit::config::KMeansConfig;
use arraykit::{Device, KMeans, KMeansResult};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CliArgs {
    /// ID of the accelerator device
    #[clap(long = "gpu-id", short = 'g', value_parser, default_value_t = 0)]
    gpu_id: usize,
    /// Number of clusters
    #[clap(long = "n-clusters", short = 'n', value_parser)]
    n_clusters: Option<usize>,
    /// Number of iterations
    #[clap(long = "maxiter", short = 'm', value_parser)]
    max_iter: Option<usize>,
    /// Use the elementwise kernels on the accelerator run
    #[clap(long, action)]
    elem: bool,
    /// Points per blob
    #[clap(long, value_parser, default_value_t = 1_000_000)]
    samples: usize,
    #[clap(long, value_parser)]
    seed: Option<u64>,
    /// JSON file with k-means settings; command-line flags take precedence
    #[clap(long, value_parser)]
    config: Option<String>,
}

impl CliArgs {
    fn resolve_config(&self) -> Result<KMeansConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => KMeansConfig::load(path)?,
            None => KMeansConfig::default(),
        };
        if let Some(n_clusters) = self.n_clusters {
            config.n_clusters = n_clusters;
        }
        if let Some(max_iter) = self.max_iter {
            config.max_iter = max_iter;
        }
        if self.elem {
            config.elementwise = true;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

// Standard-normal points shifted to +1 and to -1.
fn make_blobs(samples: usize, seed: Option<u64>) -> Result<Array2<f32>, Box<dyn Error>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let values: Vec<f32> = Distribution::<f32>::sample_iter(StandardNormal, &mut rng)
        .take(samples * 2)
        .collect();
    let base = Array2::from_shape_vec((samples, 2), values)?;
    let x = concatenate(Axis(0), &[(&base + 1.0).view(), (&base - 1.0).view()])?;
    Ok(x)
}

fn report(label: &str, result: &KMeansResult) {
    println!("{}: {} iterations", label, result.iterations);
    for (i, center) in result.centers.outer_iter().enumerate() {
        let members = result.labels.iter().filter(|&&l| l as usize == i).count();
        println!("  center {}: {:?} ({} points)", i, center.to_vec(), members);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    let config = args.resolve_config()?;
    log::info!("k-means settings: {:?}", config);

    let x = make_blobs(args.samples, config.seed)?;

    let host = KMeans::from_config(&config, Device::Cpu);
    let host_result = {
        let _timer = Timer::new(" CPU ");
        host.fit(x.view())?
    };
    report("CPU", &host_result);

    let device = Device::Cuda(args.gpu_id);
    let accelerated = KMeans::from_config(&config, device);
    let device_result = {
        let _timer = Timer::new(format!(" {} ({:?}) ", device, accelerated.module));
        accelerated.fit(x.view())?
    };
    report(&device.to_string(), &device_result);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Application error: {}", e);
        let mut current_err: Option<&(dyn Error + 'static)> = e.source();
        while let Some(source) = current_err {
            eprintln!("Caused by: {}", source);
            current_err = source.source();
        }
        std::process::exit(1);
    }
}
