use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use busy_probe::FlagMonitor;
use busy_probe::LoadMonitor;
use busy_probe::MonitorNotFound;
use clap::Parser;
use hdrhistogram::Histogram;
use http::Request;
use http::Response;
use http::StatusCode;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::ServiceExt;
use tower::service_fn;
use tower_busy::TooBusyConfig;
use tower_busy::TooBusyLayer;

/// Fire a burst of requests through the gate while the monitor flips between
/// busy and idle.
#[derive(Parser, Debug)]
struct Args {
    /// Requests per scenario
    #[arg(long, default_value_t = 50_000)]
    requests: usize,

    /// How often the monitor flips its overload state
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5ms")]
    flip_every: Duration,

    /// Simulated work per admitted request
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1ms")]
    work: Duration,
}

#[derive(Default)]
struct Outcomes {
    admitted: usize,
    shed: usize,
    errors: usize,
}

async fn run_load_test<S>(name: &str, svc: S, total_reqs: usize)
where
    S: Service<Request<String>, Response = Response<String>, Error = BoxError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    let mut hist_admitted = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
    let mut hist_shed = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();

    let mut tasks = JoinSet::new();
    let mut outcomes = Outcomes::default();

    let start = Instant::now();
    let barrier = Arc::new(Barrier::new(total_reqs));

    for _ in 0..total_reqs {
        let mut local_svc = svc.clone();
        let bar = barrier.clone();
        tasks.spawn(async move {
            bar.wait().await;
            let req_start = Instant::now();
            let req = Request::builder().body(String::new()).unwrap();
            let res = match local_svc.ready().await {
                Ok(ready_svc) => ready_svc.call(req).await,
                Err(e) => Err(e),
            };
            (res, req_start.elapsed())
        });
    }

    while let Some(task) = tasks.join_next().await {
        let (res, elapsed) = task.expect("Task panicked");
        match res {
            Ok(response) if response.status() == StatusCode::SERVICE_UNAVAILABLE => {
                outcomes.shed += 1;
                hist_shed.record(elapsed.as_micros() as u64).unwrap();
            }
            Ok(_) => {
                outcomes.admitted += 1;
                hist_admitted.record(elapsed.as_micros() as u64).unwrap();
            }
            Err(_) => outcomes.errors += 1,
        }
    }

    let total_duration = start.elapsed();
    let throughput = total_reqs as f64 / total_duration.as_secs_f64();

    println!("--- {} ---", name);
    println!("Total Duration:  {:.2?}", total_duration);
    println!("Admitted/Total:  {}/{}", outcomes.admitted, total_reqs);
    println!("Shed:            {}", outcomes.shed);
    println!("Total Rate:      {:.2} req/sec", throughput);

    if outcomes.admitted > 0 {
        println!("P50 (Admitted):  {}µs", hist_admitted.value_at_quantile(0.5));
        println!("P99 (Admitted):  {}µs", hist_admitted.value_at_quantile(0.99));
    }
    if outcomes.shed > 0 {
        println!("P50 (Shed):      {}µs", hist_shed.value_at_quantile(0.5));
        println!("P99 (Shed):      {}µs", hist_shed.value_at_quantile(0.99));
    }
    if outcomes.errors > 0 {
        println!("Errors:          {}", outcomes.errors);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    let work = args.work;
    let worker = service_fn(move |_req: Request<String>| async move {
        // Simulate real-world work
        sleep(work).await;
        Ok::<_, BoxError>(Response::new("success".to_string()))
    });

    // 1. No gate at all, the baseline
    run_load_test("No Gate", worker.clone(), args.requests).await;

    // 2. Gate with a monitor flipping between busy and idle
    let monitor = Arc::new(FlagMonitor::default());
    let flipper = {
        let monitor = monitor.clone();
        let period = args.flip_every;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                monitor.set_overloaded(!monitor.is_overloaded());
            }
        })
    };
    let layer = TooBusyLayer::new(monitor, TooBusyConfig::default());
    run_load_test("Flipping Gate", layer.layer(worker.clone()), args.requests).await;
    flipper.abort();
    layer.shutdown();

    // 3. Degraded gate, monitor not found
    let degraded = TooBusyLayer::from_loader(
        || Err(MonitorNotFound::new("toobusy").into()),
        TooBusyConfig::default(),
    )?;
    run_load_test("Degraded Gate", degraded.layer(worker), args.requests).await;

    Ok(())
}
