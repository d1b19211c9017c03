//! Static catalog of spatial query templates.
//!
//! Every on-demand endpoint is described by a [`LayerQuery`]: the HTTP path
//! it is served under, the SQL template the engine executes, and the shape
//! of the JSON payload the query produces. The route table is built once at
//! startup by iterating [`LAYER_QUERIES`]; notifications never touch it.
//!
//! The SQL delegates all spatial work (buffering, overlay, clustering,
//! shortest path) to PostGIS and pgRouting. Templates that depend on the
//! watched entity take it as a bind parameter; everything else is
//! parameter-free.

/// The JSON shape a catalog query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// A single-row `geojson` column holding a GeoJSON `FeatureCollection`.
    FeatureCollection,
    /// A single-row `geojson` column holding one GeoJSON geometry
    /// (merged-line shortest path).
    Geometry,
}

/// A static descriptor mapping an HTTP path to a spatial query template.
#[derive(Debug, Clone, Copy)]
pub struct LayerQuery {
    /// Short name used in logs when the engine rejects the template.
    pub name: &'static str,
    /// HTTP path the query is served under.
    pub path: &'static str,
    /// SQL template executed against the engine.
    pub sql: &'static str,
    /// Shape of the produced payload.
    pub shape: ResponseShape,
}

/// Target vertex of the road graph used by all routing queries.
pub const ROUTE_TARGET_VERTEX: i64 = 4073;

/// City polygon layer as a styled `FeatureCollection`.
const CITY_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(geom)::json,
            'properties', json_build_object(
              'id', gid,
              'color', '#C1FFC1'
            )
          )
        )
      ) AS geojson
    FROM
      city";

/// Ground polygon layer as a styled `FeatureCollection`.
const GROUND_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(geom)::json,
            'properties', json_build_object(
              'id', gid,
              'color', '#0000ff'
            )
          )
        )
      ) AS geojson
    FROM
      ground";

/// Intersection of the city and ground layers.
const OVERLAP_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(geom)::json,
            'properties', json_build_object(
              'id', gid,
              'color', 'red'
            )
          )
        )
      ) AS geojson
    FROM (
      SELECT g.gid, ST_Intersection(g.geom, c.geom) AS geom
      FROM city c, ground g
      WHERE ST_Intersects(g.geom, c.geom)
    ) AS distinct_features";

/// Union of all point-of-interest layers (traffic, house, parking, shopping).
const TRAFFIC_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(geom)::json,
            'properties', json_build_object(
              'id', gid,
              'name', name
            )
          )
        )
      ) AS geojson
    FROM (
      SELECT * FROM traffic
      UNION ALL
      SELECT * FROM house
      UNION ALL
      SELECT * FROM parking
      UNION ALL
      SELECT * FROM shopping
    ) AS combined_data";

/// Buffer zone around the traffic lines.
const TRAFFIC_BUFFER_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(subq.geom)::json,
            'properties', json_build_object(
              'name', 'traffic buffer'
            )
          )
        )
      ) AS geojson
    FROM (
      SELECT ST_Buffer(ST_Union(geom), 0.0005) AS geom
      FROM traffic
    ) AS subq";

/// Buffer zone around the residential areas.
const HOUSE_BUFFER_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(subq.geom)::json,
            'properties', json_build_object(
              'name', 'house buffer'
            )
          )
        )
      ) AS geojson
    FROM (
      SELECT ST_Buffer(ST_Union(geom), 0.002) AS geom
      FROM house
    ) AS subq";

/// Buffer zone around the shopping areas.
const SHOPPING_BUFFER_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(subq.geom)::json,
            'properties', json_build_object(
              'name', 'shopping buffer'
            )
          )
        )
      ) AS geojson
    FROM (
      SELECT ST_Buffer(ST_Union(geom), 0.005) AS geom
      FROM shopping
    ) AS subq";

/// Buffer zone around the parking areas.
const PARKING_BUFFER_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(subq.geom)::json,
            'properties', json_build_object(
              'name', 'parking buffer'
            )
          )
        )
      ) AS geojson
    FROM (
      SELECT ST_Buffer(ST_Union(geom), 0.0025) AS geom
      FROM parking
    ) AS subq";

/// Site-selection result set: (house ∩ traffic ∩ parking buffers) minus the
/// shopping buffer.
const RESULT_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(subq.geom)::json,
            'properties', json_build_object(
              'name', 'result set'
            )
          )
        )
      ) AS geojson
    FROM (
      WITH house_buffers AS (
        SELECT ST_Buffer(ST_Union(geom), 0.002) AS geom
        FROM house
      ),
      traffic_buffers AS (
        SELECT ST_Buffer(ST_Union(geom), 0.0005) AS geom
        FROM traffic
      ),
      parking_buffers AS (
        SELECT ST_Buffer(ST_Union(geom), 0.0025) AS geom
        FROM parking
      ),
      intersection AS (
        SELECT ST_Intersection(h.geom, tb.geom) AS intersection_geom
        FROM house_buffers h
        JOIN traffic_buffers tb ON ST_Intersects(h.geom, tb.geom)
      ),
      final_intersection AS (
        SELECT ST_Intersection(i.intersection_geom, pb.geom) AS geom
        FROM intersection i
        JOIN parking_buffers pb ON ST_Intersects(i.intersection_geom, pb.geom)
      ),
      shopping_buffers AS (
        SELECT ST_Buffer(ST_Union(geom), 0.005) AS geom
        FROM shopping
      )
      SELECT ST_Difference(final_intersection.geom, shopping_buffers.geom) AS geom
      FROM final_intersection, shopping_buffers
    ) AS subq";

/// Full road network (edges and graph vertices) in WGS 84.
const ROUTE_SQL: &str = r"
    SELECT
      json_build_object(
        'type', 'FeatureCollection',
        'features', json_agg(
          json_build_object(
            'type', 'Feature',
            'geometry', ST_AsGeoJSON(subq.geom)::json,
            'properties', json_build_object(
              'name', 'road network'
            )
          )
        )
      ) AS geojson
    FROM (
      SELECT ST_Union(ST_Transform(geom, 4326)) AS geom
      FROM lixia_feature
      UNION ALL
      SELECT ST_Union(ST_Transform(the_geom, 4326)) AS geom
      FROM lixia_feature_vertices_pgr
    ) AS subq";

/// Undirected shortest path from vertex 5834 to the target vertex.
const DIJKSTRA0_SQL: &str = r"
    SELECT
      ST_AsGeoJSON(ST_LineMerge(ST_Union(ST_Transform(lixia_feature.geom, 4326))))::json AS geojson
    FROM
      pgr_dijkstra(
        'SELECT gid AS id,
                source, target,
                cost, reverse_cost,
                name,
                geom
         FROM lixia_feature',
        5834, 4073,
        directed := FALSE
      ) AS dijkstra
    JOIN lixia_feature ON dijkstra.edge = lixia_feature.gid";

/// Directed shortest path from vertex 4798 to the target vertex.
const DIJKSTRA1_SQL: &str = r"
    SELECT
      ST_AsGeoJSON(ST_LineMerge(ST_Union(ST_Transform(lixia_feature.geom, 4326))))::json AS geojson
    FROM
      pgr_dijkstra(
        'SELECT gid AS id,
                source, target,
                cost, reverse_cost,
                name,
                geom
         FROM lixia_feature',
        4798, 4073,
        directed := true
      ) AS dijkstra
    JOIN lixia_feature ON dijkstra.edge = lixia_feature.gid";

/// All on-demand layer endpoints, registered once at router construction.
pub const LAYER_QUERIES: &[LayerQuery] = &[
    LayerQuery {
        name: "city",
        path: "/city",
        sql: CITY_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "ground",
        path: "/ground",
        sql: GROUND_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "overlap",
        path: "/overlap",
        sql: OVERLAP_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "traffic",
        path: "/traffic",
        sql: TRAFFIC_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "traffic_buffer",
        path: "/trafficBuffer",
        sql: TRAFFIC_BUFFER_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "house_buffer",
        path: "/houseBuffer",
        sql: HOUSE_BUFFER_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "shopping_buffer",
        path: "/shoppingBuffer",
        sql: SHOPPING_BUFFER_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "parking_buffer",
        path: "/parkingBuffer",
        sql: PARKING_BUFFER_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "result",
        path: "/result",
        sql: RESULT_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "route",
        path: "/route",
        sql: ROUTE_SQL,
        shape: ResponseShape::FeatureCollection,
    },
    LayerQuery {
        name: "dijkstra0",
        path: "/dijkstra0",
        sql: DIJKSTRA0_SQL,
        shape: ResponseShape::Geometry,
    },
    LayerQuery {
        name: "dijkstra1",
        path: "/dijkstra1",
        sql: DIJKSTRA1_SQL,
        shape: ResponseShape::Geometry,
    },
];

/// Coordinates of every tracked entity.
pub const MARKERS_SQL: &str = r"
    SELECT
      ST_X(geom) AS x,
      ST_Y(geom) AS y
    FROM
      car";

/// Position update for one tracked entity. `$1` is a WKT point, `$2` the
/// entity id. Returns the new position and its GeoJSON rendering.
pub const UPDATE_POSITION_SQL: &str = r"
    UPDATE car
    SET geom = ST_GeomFromText($1, 4326)
    WHERE id = $2
    RETURNING
      id::BIGINT AS id,
      ST_X(geom) AS x,
      ST_Y(geom) AS y,
      ST_AsGeoJSON(geom)::json AS geom";

/// DBSCAN cluster membership count for the cluster containing entity `$1`
/// (eps 100 m in EPSG:3857, minpoints 2).
pub const CLUSTER_COUNT_SQL: &str = r"
    WITH ClusteredData AS (
      SELECT
        id,
        ST_ClusterDBSCAN(ST_Transform(geom, 3857), eps := 100, minpoints := 2) OVER () AS cid
      FROM
        car
    )
    SELECT
      COUNT(*) AS num_points_in_cluster
    FROM
      ClusteredData
    WHERE
      cid = (SELECT cid FROM ClusteredData WHERE id = $1)";

/// Directed shortest path from the graph vertex nearest entity `$1` to the
/// target vertex `$2`, merged into one line.
pub const NEAREST_ROUTE_SQL: &str = r"
    WITH nearest_source AS (
      SELECT id
      FROM lixia_feature_vertices_pgr
      WHERE ST_DWithin(the_geom, ST_Transform((SELECT geom FROM car WHERE id = $1), 3857), 0.1) = true
    )
    SELECT
      ST_AsGeoJSON(ST_LineMerge(ST_Union(ST_Transform(lixia_feature.geom, 4326))))::json AS geojson
    FROM
      pgr_dijkstra(
        'SELECT gid AS id,
                source, target,
                cost, reverse_cost,
                name,
                geom
         FROM lixia_feature',
        (SELECT id FROM nearest_source), $2,
        directed := true
      ) AS dijkstra
    JOIN lixia_feature ON dijkstra.edge = lixia_feature.gid";

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn catalog_paths_are_unique_and_rooted() {
        let mut seen = BTreeSet::new();
        for query in LAYER_QUERIES {
            assert!(query.path.starts_with('/'), "{} not rooted", query.name);
            assert!(seen.insert(query.path), "duplicate path {}", query.path);
        }
    }

    #[test]
    fn catalog_queries_are_parameter_free() {
        // On-demand layer templates take no request input; bind markers
        // would indicate a template that belongs in the engine trait.
        for query in LAYER_QUERIES {
            assert!(!query.sql.contains("$1"), "{} has a bind", query.name);
        }
    }

    #[test]
    fn routing_queries_produce_bare_geometry() {
        let geometry: Vec<_> = LAYER_QUERIES
            .iter()
            .filter(|q| q.shape == ResponseShape::Geometry)
            .map(|q| q.name)
            .collect();
        assert_eq!(geometry, vec!["dijkstra0", "dijkstra1"]);
    }

    #[test]
    fn watched_entity_templates_are_parameterized() {
        assert!(CLUSTER_COUNT_SQL.contains("$1"));
        assert!(NEAREST_ROUTE_SQL.contains("$1"));
        assert!(NEAREST_ROUTE_SQL.contains("$2"));
        assert!(UPDATE_POSITION_SQL.contains("ST_GeomFromText($1, 4326)"));
    }
}
