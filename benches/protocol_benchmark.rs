use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use periph_hal::coprocessor::{
    decode_access_point_list, encode_access_point_list, AuthenticationMode, ConnectEventData,
    EventFrame, StatusCode, WiFiFunction, WiFiNetwork,
};

fn networks(count: usize) -> Vec<WiFiNetwork> {
    (0..count)
        .map(|i| WiFiNetwork {
            ssid: format!("access-point-{i:02}"),
            bssid: [0x24, 0x0A, 0xC4, 0x00, (i >> 8) as u8, i as u8],
            primary_channel: (i % 13) as u8 + 1,
            secondary_channel: 0,
            rssi: -40 - (i % 50) as i8,
            authentication: AuthenticationMode::Wpa2Psk,
            protocols: 0x07,
        })
        .collect()
}

fn benchmark_access_point_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("access_point_list");
    for count in [1usize, 16, 64] {
        let list = networks(count);
        let encoded = encode_access_point_list(&list);

        group.bench_with_input(BenchmarkId::new("encode", count), &list, |b, list| {
            b.iter(|| encode_access_point_list(black_box(list)))
        });
        group.bench_with_input(BenchmarkId::new("decode", count), &encoded, |b, encoded| {
            b.iter(|| decode_access_point_list(black_box(encoded)))
        });
    }
    group.finish();
}

fn benchmark_event_decode(c: &mut Criterion) {
    let data = ConnectEventData {
        ssid: "workshop".to_string(),
        bssid: [0x24, 0x0A, 0xC4, 0x11, 0x22, 0x33],
        channel: 6,
        authentication: AuthenticationMode::Wpa2Psk,
    };
    let frame = EventFrame::new(
        WiFiFunction::ConnectToAccessPointEvent,
        StatusCode::CompletedOk,
        data.encode(),
    )
    .encode();

    c.bench_function("decode_connect_event", |b| {
        b.iter(|| {
            let event = EventFrame::decode(black_box(&frame)).unwrap();
            ConnectEventData::decode(&event.payload).unwrap()
        })
    });
}

criterion_group!(benches, benchmark_access_point_list, benchmark_event_decode);
criterion_main!(benches);
